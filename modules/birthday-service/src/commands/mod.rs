//! Chat command handling, independent of the transport that delivers it.

mod add;
mod help;
mod list;
mod next;
mod remove;

use crate::db::Db;
use crate::format::escape_markdown;
use chrono::NaiveDate;

pub const NO_BIRTHDAYS: &str = "No birthdays yet";

/// Available commands. The payload is the raw argument text.
#[derive(Debug, PartialEq)]
pub enum Command {
    /// Closest birthdays first: `aniversarios [chatId]`
    Birthdays(String),
    /// Ages in calendar order: `idades [chatId]`
    Ages(String),
    /// The next birthday: `proximo [chatId]`
    Next(String),
    /// `add Name, 1999-11-25[, chatId]` (admin)
    Add(String),
    /// `remove Name[, 1999-11-25][, chatId]` (admin)
    Remove(String),
    /// `clear [chatId]` (admin)
    Clear(String),
    Help,
}

impl Command {
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Command::Add(_) | Command::Remove(_) | Command::Clear(_))
    }
}

/// Where a command was sent from and what it may do.
pub struct CommandContext<'a> {
    pub chat_id: i64,
    pub is_group: bool,
    pub admin: bool,
    pub db: &'a Db,
    pub today: NaiveDate,
}

impl CommandContext<'_> {
    /// The chat a read command applies to. Group chats always use themselves;
    /// private chats must name a chat id.
    fn target_chat(&self, arg: &str) -> Result<i64, String> {
        if self.is_group {
            return Ok(self.chat_id);
        }
        let arg = arg.trim();
        if arg.is_empty() {
            return Err("Need a Chat ID on a private chat.".to_string());
        }
        arg.parse::<i64>().map_err(|_| {
            format!("Invalid Chat ID provided, got '{}'.", escape_markdown(arg))
        })
    }
}

/// Parse a command from message text, e.g. `/proximo@BirthdayBot -100123`.
/// With `bot_username` set, commands addressed to another bot are ignored.
pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim();
    let body = text.strip_prefix('/')?;
    let (head, args) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (body, ""),
    };
    let (command, addressee) = match head.split_once('@') {
        Some((command, addressee)) => (command, Some(addressee)),
        None => (head, None),
    };
    if let (Some(addressee), Some(me)) = (addressee, bot_username) {
        if !addressee.eq_ignore_ascii_case(me) {
            log::debug!("Birthday commands: '{}' is addressed to @{}", text, addressee);
            return None;
        }
    }
    let command = command.to_lowercase();

    log::debug!("Birthday commands: Parsing '{}' -> '{}' args '{}'", text, command, args);

    let args = args.to_string();
    match command.as_str() {
        "aniversarios" | "aniversários" | "birthdays" => Some(Command::Birthdays(args)),
        "idades" | "list" | "ages" => Some(Command::Ages(args)),
        "proximo" | "próximo" | "next" => Some(Command::Next(args)),
        "add" => Some(Command::Add(args)),
        "remove" => Some(Command::Remove(args)),
        "clear" => Some(Command::Clear(args)),
        "help" | "start" => Some(Command::Help),
        _ => {
            log::debug!("Birthday commands: Unknown command '{}'", command);
            None
        }
    }
}

/// Execute a command and return the reply text (Telegram Markdown).
/// `Err` is reserved for failures of the service itself.
pub fn execute(cmd: Command, ctx: &CommandContext) -> Result<String, String> {
    if cmd.is_admin_only() && !ctx.admin {
        return Ok(permission_denied_message());
    }

    match cmd {
        Command::Birthdays(arg) => with_chat(ctx, &arg, |chat| list::birthdays(ctx, chat)),
        Command::Ages(arg) => with_chat(ctx, &arg, |chat| list::ages(ctx, chat)),
        Command::Next(arg) => with_chat(ctx, &arg, |chat| next::execute(ctx, chat)),
        Command::Add(arg) => add::execute(ctx, &arg),
        Command::Remove(arg) => remove::execute(ctx, &arg),
        Command::Clear(arg) => with_chat(ctx, &arg, |chat| {
            let removed = ctx.db.clear_chat(chat).map_err(|e| e.to_string())?;
            log::info!("Birthday commands: cleared {} birthdays of chat {}", removed, chat);
            Ok(format!("Cleared {} birthdays, oops", removed))
        }),
        Command::Help => Ok(help::execute(ctx.admin)),
    }
}

fn with_chat(
    ctx: &CommandContext,
    arg: &str,
    run: impl FnOnce(i64) -> Result<String, String>,
) -> Result<String, String> {
    match ctx.target_chat(arg) {
        Ok(chat) => run(chat),
        Err(message) => Ok(message),
    }
}

/// Entries for the chat command menu.
pub fn menu(admin: bool) -> Vec<(&'static str, &'static str)> {
    let mut entries = vec![
        (
            "aniversarios",
            "Mostra a lista completa de aniversários ordenados do mais próximo para o mais distante",
        ),
        (
            "idades",
            "Mostra a lista completa de idades ordenadas por data de nascimento",
        ),
        ("proximo", "Mostra o próximo aniversário"),
    ];
    if admin {
        entries.extend([
            ("add", "[ADMIN] Adiciona novo aniversario"),
            ("remove", "[ADMIN] Remove um aniversario"),
            ("clear", "[ADMIN] Apaga todos os aniversarios do chat"),
        ]);
    }
    entries
}

/// Message shown when a chat tries to run an admin command
pub fn permission_denied_message() -> String {
    "You don't have permission to run that command.\n\n\
    *Available commands:*\n\
    - `/aniversarios` - Birthdays, closest first\n\
    - `/idades` - Ages in calendar order\n\
    - `/proximo` - The next birthday"
        .to_string()
}

/// Split comma separated arguments, trimming each field.
fn fields(arg: &str) -> Vec<&str> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    arg.split(',').map(str::trim).collect()
}
