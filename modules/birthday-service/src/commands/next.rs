//! Next command - the most imminent birthday

use super::{CommandContext, NO_BIRTHDAYS, list};
use crate::format;

/// Execute the next command
pub fn execute(ctx: &CommandContext, chat_id: i64) -> Result<String, String> {
    let items = list::load(ctx, chat_id)?;
    match format::next_occasion(&items) {
        Some(next) => Ok(format::next_birthday(next)),
        None => Ok(NO_BIRTHDAYS.to_string()),
    }
}
