//! Remove command - deletes one birthday by name

use super::{CommandContext, fields};
use crate::format::escape_markdown;
use crate::recurrence::parse_date;

fn usage(ctx: &CommandContext) -> String {
    if ctx.is_group {
        "Please provide a name in this format: `/remove John` or `/remove John, 1999-11-25`"
            .to_string()
    } else {
        "Please provide a name and a chatId in this format: `/remove John, 1999-11-25, -12345`"
            .to_string()
    }
}

/// Execute the remove command: `Name[, YYYY-MM-DD][, chatId]`
pub fn execute(ctx: &CommandContext, arg: &str) -> Result<String, String> {
    let parts = fields(arg);
    let Some(name) = parts.first().filter(|n| !n.is_empty()) else {
        return Ok(usage(ctx));
    };

    let mut date = None;
    let mut chat_id = None;
    for field in parts.iter().skip(1).filter(|f| !f.is_empty()) {
        if parse_date(field).is_ok() {
            date = Some(*field);
        } else if let Ok(id) = field.parse::<i64>() {
            chat_id = Some(id);
        } else {
            return Ok(format!(
                "Couldn't understand '{}', expected a date or a chat id",
                escape_markdown(field)
            ));
        }
    }

    let chat_id = match chat_id {
        Some(id) => id,
        None if ctx.is_group => ctx.chat_id,
        None => return Ok(usage(ctx)),
    };

    match ctx.db.remove_birthday(chat_id, name, date) {
        Ok(record) => {
            log::info!(
                "Birthday commands: removed '{}' ({}) from chat {}",
                record.name,
                record.date,
                chat_id
            );
            Ok(format!("Removed {}", escape_markdown(&record.name)))
        }
        Err(e) if e.is_caller_error() => Ok(escape_markdown(&e.to_string())),
        Err(e) => Err(e.to_string()),
    }
}
