use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub telegram_token: Option<String>,
    /// Receive updates through `POST /telegram/webhook` instead of long polling
    pub telegram_webhook: bool,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook requests
    pub telegram_webhook_secret: Option<String>,
    /// Enables /add, /remove and /clear in chats
    pub admin_commands: bool,
    /// Only notify this chat; every chat with birthdays otherwise
    pub notify_chat_id: Option<i64>,
    pub notify_hour: u32,
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| {
            lookup(key)
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(false)
        };

        Self {
            port: lookup("BIRTHDAY_BOT_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(9103),
            db_path: lookup("BIRTHDAY_BOT_DB_PATH").unwrap_or_else(|| "./birthdays.db".to_string()),
            telegram_token: lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()),
            telegram_webhook: flag("TELEGRAM_WEBHOOK"),
            telegram_webhook_secret: lookup("TELEGRAM_WEBHOOK_SECRET")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            admin_commands: flag("BIRTHDAY_ADMIN_COMMANDS"),
            notify_chat_id: lookup("BIRTHDAY_NOTIFY_CHAT_ID").and_then(|s| s.trim().parse().ok()),
            notify_hour: lookup("BIRTHDAY_NOTIFY_HOUR")
                .and_then(|s| s.parse().ok())
                .filter(|h| *h < 24)
                .unwrap_or(9),
            poll_interval_secs: lookup("BIRTHDAY_POLL_INTERVAL")
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(300), // 5 minutes default
        }
    }
}
