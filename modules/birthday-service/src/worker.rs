//! Background worker for birthday notifications.
//!
//! Every N seconds, once the configured hour has passed, sends a salutation to
//! each chat for every birthday happening today. Each record is celebrated at
//! most once per day, across restarts.

use crate::recurrence;
use crate::routes::AppState;
use crate::salutations;
use crate::telegram::TelegramBot;
use async_trait::async_trait;
use birthday_types::SentNotification;
use std::sync::Arc;
use std::time::Duration;

/// Something that can deliver a message to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), String>;
}

#[async_trait]
impl Notifier for TelegramBot {
    async fn notify(&self, chat_id: i64, text: &str) -> Result<(), String> {
        self.client.send_message(chat_id, text).await
    }
}

pub async fn run_worker(
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    notify_hour: u32,
    poll_interval_secs: u64,
) {
    log::info!(
        "[BIRTHDAY_NOTIFIER] Worker started (poll interval: {}s, notify from {}h)",
        poll_interval_secs,
        notify_hour
    );

    loop {
        tokio::time::sleep(Duration::from_secs(poll_interval_secs)).await;

        if state.clock.hour() < notify_hour {
            continue;
        }

        match notify_tick(&state, notifier.as_ref(), None).await {
            Ok(sent) => {
                if !sent.is_empty() {
                    log::info!("[BIRTHDAY_NOTIFIER] Sent {} salutations", sent.len());
                }
                let now = chrono::Utc::now().to_rfc3339();
                *state.last_tick_at.lock().await = Some(now);
            }
            Err(e) => {
                log::error!("[BIRTHDAY_NOTIFIER] Tick error: {}", e);
            }
        }
    }
}

/// One notification pass. `only_chat` overrides the configured notify chat;
/// with neither, every chat with birthdays is visited. Passes never overlap.
pub async fn notify_tick(
    state: &AppState,
    notifier: &dyn Notifier,
    only_chat: Option<i64>,
) -> Result<Vec<SentNotification>, String> {
    let _tick = state.tick_lock.lock().await;
    let chats = match only_chat.or(state.notify_chat_id) {
        Some(chat) => vec![chat],
        None => state
            .db
            .list_chats()
            .map_err(|e| format!("Failed to list chats: {}", e))?,
    };
    let today = state.clock.today();
    let mut sent = Vec::new();

    for chat_id in chats {
        let records = state
            .db
            .list_birthdays(chat_id)
            .map_err(|e| format!("Failed to list birthdays: {}", e))?;
        let items = match recurrence::annotate(records, today) {
            Ok(items) => items,
            Err(e) => {
                log::warn!("[BIRTHDAY_NOTIFIER] Skipping chat {}: {}", chat_id, e);
                continue;
            }
        };

        for item in items.iter().filter(|i| i.days_until_next == 0) {
            let already = state
                .db
                .was_notified(item.record.id, today)
                .map_err(|e| e.to_string())?;
            if already {
                continue;
            }

            let message = salutations::random(item);
            if let Err(e) = notifier.notify(chat_id, &message).await {
                log::warn!(
                    "[BIRTHDAY_NOTIFIER] Failed to notify chat {} about {}: {}",
                    chat_id,
                    item.record.name,
                    e
                );
                continue;
            }
            state
                .db
                .mark_notified(chat_id, item.record.id, today)
                .map_err(|e| e.to_string())?;
            sent.push(SentNotification {
                chat_id,
                name: item.record.name.clone(),
                message,
            });
        }
    }

    Ok(sent)
}
