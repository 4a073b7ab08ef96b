//! Add command - stores a new birthday

use super::{CommandContext, fields};
use crate::db::NewBirthday;
use crate::error::BirthdayError;
use crate::format::escape_markdown;

fn usage(ctx: &CommandContext) -> String {
    if ctx.is_group {
        "Please provide a name, a date in this format: `/add John, 1999-11-25`".to_string()
    } else {
        "Please provide a name, a date and a chatId in this format: `/add John, 1999-11-25, -12345`"
            .to_string()
    }
}

/// Execute the add command: `Name, YYYY-MM-DD[, chatId]`
pub fn execute(ctx: &CommandContext, arg: &str) -> Result<String, String> {
    let parts = fields(arg);
    let (name, date) = match parts.as_slice() {
        [name, date, ..] if !name.is_empty() && !date.is_empty() => (*name, *date),
        _ => return Ok(usage(ctx)),
    };

    let chat_id = match parts.get(2).filter(|c| !c.is_empty()) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => id,
            Err(_) => return Ok(format!("Invalid Chat ID, got {}", escape_markdown(raw))),
        },
        None if ctx.is_group => ctx.chat_id,
        None => return Ok(usage(ctx)),
    };

    let new = NewBirthday {
        name: name.to_string(),
        date: date.to_string(),
        ..Default::default()
    };
    match ctx.db.add_birthday(chat_id, new) {
        Ok(record) => {
            log::info!(
                "Birthday commands: added '{}' ({}) to chat {}",
                record.name,
                record.date,
                chat_id
            );
            Ok(format!("Added {} — {}", escape_markdown(&record.name), record.date))
        }
        Err(BirthdayError::InvalidDate { .. }) => Ok(
            "Couldn't parse date, please provide a date in this format: `/add John, 1999-11-25`"
                .to_string(),
        ),
        Err(e) if e.is_caller_error() => Ok(escape_markdown(&e.to_string())),
        Err(e) => Err(e.to_string()),
    }
}
