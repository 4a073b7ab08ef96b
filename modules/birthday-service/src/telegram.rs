//! Telegram Bot API transport: a small JSON client, update handling and the
//! long-polling loop. Webhook delivery goes through `routes::telegram_webhook`.

use crate::commands::{self, CommandContext};
use crate::format::escape_markdown;
use crate::routes::AppState;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT_SECS: u64 = 30;
const ERROR_BACKOFF_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub new_chat_members: Option<Vec<User>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Chat {
    pub fn is_group(&self) -> bool {
        matches!(self.kind.as_str(), "group" | "supergroup")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

pub struct TelegramClient {
    token: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn parse_telegram_error(status: reqwest::StatusCode, body: &str) -> String {
        if let Ok(error_json) = serde_json::from_str::<Value>(body) {
            let error_code = error_json.get("error_code").and_then(|c| c.as_u64()).unwrap_or(0);
            let description = error_json
                .get("description")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            format!("Telegram API error: {} (code {})", description, error_code)
        } else {
            format!("Telegram API error ({}): {}", status, body)
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T, String> {
        let url = format!("{}/bot{}/{}", API_BASE, self.token, method);

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| format!("Failed to call Telegram API {}: {}", method, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Self::parse_telegram_error(status, &body));
        }

        let response_json: Value = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse Telegram response: {}", e))?;

        // Telegram wraps results in {"ok": true, "result": ...}
        if response_json.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(Self::parse_telegram_error(status, &body));
        }

        let result = response_json
            .get("result")
            .cloned()
            .ok_or_else(|| "Telegram API returned ok but no result field".to_string())?;
        serde_json::from_value(result)
            .map_err(|e| format!("Unexpected Telegram {} result: {}", method, e))
    }

    pub async fn get_me(&self) -> Result<User, String> {
        self.call("getMe", &json!({})).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), String> {
        let _: Value = self
            .call(
                "sendMessage",
                &json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "Markdown",
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, String> {
        let mut params = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }
        self.call("getUpdates", &params).await
    }

    pub async fn set_my_commands(&self, entries: &[(&str, &str)]) -> Result<(), String> {
        let commands: Vec<Value> = entries
            .iter()
            .map(|(command, description)| json!({"command": command, "description": description}))
            .collect();
        let _: bool = self
            .call("setMyCommands", &json!({ "commands": commands }))
            .await?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<(), String> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }
}

/// A connected bot: the API client plus the bot's own identity.
pub struct TelegramBot {
    pub client: TelegramClient,
    pub me: User,
}

impl TelegramBot {
    pub async fn connect(token: &str) -> Result<Self, String> {
        let client = TelegramClient::new(token);
        let me = client.get_me().await?;
        log::info!(
            "[TELEGRAM] Connected as @{} (id {})",
            me.username.as_deref().unwrap_or(&me.first_name),
            me.id
        );
        Ok(Self { client, me })
    }
}

/// Work out the reply to a message, if any. Commands run synchronously
/// against the store.
pub fn reply_for(state: &AppState, me: &User, message: &Message) -> Option<String> {
    if let Some(members) = &message.new_chat_members {
        if members.iter().any(|m| m.id == me.id) {
            return message.chat.title.as_ref().map(|title| {
                format!("Howdy {}! (id: {})", escape_markdown(title), message.chat.id)
            });
        }
    }

    let cmd = commands::parse(message.text.as_deref()?, me.username.as_deref())?;
    let ctx = CommandContext {
        chat_id: message.chat.id,
        is_group: message.chat.is_group(),
        admin: state.admin_commands,
        db: &state.db,
        today: state.clock.today(),
    };
    match commands::execute(cmd, &ctx) {
        Ok(reply) => Some(reply),
        Err(e) => {
            log::error!("[TELEGRAM] Command failed in chat {}: {}", message.chat.id, e);
            Some("Error getting data".to_string())
        }
    }
}

pub async fn handle_update(state: &AppState, bot: &TelegramBot, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    if let Some(reply) = reply_for(state, &bot.me, &message) {
        if let Err(e) = bot.client.send_message(message.chat.id, &reply).await {
            log::warn!("[TELEGRAM] Failed to reply in chat {}: {}", message.chat.id, e);
        }
    }
}

/// Long-poll for updates until the process stops.
pub async fn run_polling(state: Arc<AppState>, bot: Arc<TelegramBot>) {
    log::info!("[TELEGRAM] Long polling started");
    if let Err(e) = bot.client.delete_webhook().await {
        log::warn!("[TELEGRAM] Could not clear webhook before polling: {}", e);
    }

    let mut offset: Option<i64> = None;
    loop {
        match bot.client.get_updates(offset, LONG_POLL_TIMEOUT_SECS).await {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    handle_update(&state, &bot, update).await;
                }
            }
            Err(e) => {
                log::error!("[TELEGRAM] getUpdates error: {}", e);
                tokio::time::sleep(Duration::from_secs(ERROR_BACKOFF_SECS)).await;
            }
        }
    }
}
