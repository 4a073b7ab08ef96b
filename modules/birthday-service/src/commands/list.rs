//! List commands - birthdays by proximity and ages in calendar order

use super::{CommandContext, NO_BIRTHDAYS};
use crate::format;
use crate::recurrence::{self, AnnotatedBirthday};

/// Fetch and annotate every birthday of a chat. Nothing is returned unless
/// every record could be annotated.
pub(super) fn load(ctx: &CommandContext, chat_id: i64) -> Result<Vec<AnnotatedBirthday>, String> {
    let records = ctx.db.list_birthdays(chat_id).map_err(|e| e.to_string())?;
    recurrence::annotate(records, ctx.today).map_err(|e| {
        log::error!("Birthday commands: chat {} has an unreadable record: {}", chat_id, e);
        e.to_string()
    })
}

/// Execute the birthdays command
pub fn birthdays(ctx: &CommandContext, chat_id: i64) -> Result<String, String> {
    let mut items = load(ctx, chat_id)?;
    if items.is_empty() {
        return Ok(NO_BIRTHDAYS.to_string());
    }
    format::sort_closest(&mut items);
    Ok(items
        .iter()
        .map(format::birthday_line)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Execute the ages command
pub fn ages(ctx: &CommandContext, chat_id: i64) -> Result<String, String> {
    let mut items = load(ctx, chat_id)?;
    if items.is_empty() {
        return Ok(NO_BIRTHDAYS.to_string());
    }
    format::sort_calendar(&mut items);
    Ok(items
        .iter()
        .map(format::age_line)
        .collect::<Vec<_>>()
        .join("\n"))
}
