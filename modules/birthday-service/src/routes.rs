//! Axum route handlers for the birthday bot RPC API.

use crate::clock::Clock;
use crate::commands::{self, CommandContext};
use crate::db::Db;
use crate::error::BirthdayError;
use crate::format;
use crate::recurrence::{self, AnnotatedBirthday};
use crate::telegram::{self, TelegramBot, Update};
use crate::worker;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use birthday_types::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub struct AppState {
    pub db: Arc<Db>,
    pub start_time: Instant,
    pub clock: Arc<dyn Clock>,
    pub telegram: Option<Arc<TelegramBot>>,
    pub admin_commands: bool,
    pub notify_chat_id: Option<i64>,
    pub last_tick_at: Arc<Mutex<Option<String>>>,
    /// Held for the whole of a notification tick
    pub tick_lock: Mutex<()>,
    pub webhook_secret: Option<String>,
}

type RpcResult<T> = (StatusCode, Json<RpcResponse<T>>);

fn ok<T: serde::Serialize>(data: T) -> RpcResult<T> {
    (StatusCode::OK, Json(RpcResponse::ok(data)))
}

fn fail<T: serde::Serialize>(e: BirthdayError) -> RpcResult<T> {
    let status = if e.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(RpcResponse::err(e.to_string())))
}

fn annotated(state: &AppState, chat_id: i64) -> Result<Vec<AnnotatedBirthday>, BirthdayError> {
    let records = state.db.list_birthdays(chat_id)?;
    recurrence::annotate(records, state.clock.today())
}

fn upcoming(item: &AnnotatedBirthday, line: String) -> UpcomingBirthday {
    UpcomingBirthday {
        record: item.record.clone(),
        days_until_next: item.days_until_next,
        current_age: item.current_age,
        turning_age: item.turning_age,
        line,
    }
}

// POST /rpc/birthdays/add
pub async fn add_birthday(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddBirthdayRequest>,
) -> RpcResult<BirthdayRecord> {
    let chat_id = req.chat_id;
    match state.db.add_birthday(chat_id, req.into()) {
        Ok(record) => {
            log::info!("Added '{}' ({}) to chat {}", record.name, record.date, chat_id);
            ok(record)
        }
        Err(e) => fail(e),
    }
}

// POST /rpc/birthdays/remove
pub async fn remove_birthday(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RemoveBirthdayRequest>,
) -> RpcResult<RemoveResult> {
    match state
        .db
        .remove_birthday(req.chat_id, &req.name, req.date.as_deref())
    {
        Ok(removed) => ok(RemoveResult { removed }),
        Err(e) => fail(e),
    }
}

// POST /rpc/birthdays/clear
pub async fn clear_birthdays(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> RpcResult<usize> {
    match state.db.clear_chat(req.chat_id) {
        Ok(n) => ok(n),
        Err(e) => fail(e),
    }
}

// POST /rpc/birthdays/list
pub async fn list_birthdays(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> RpcResult<Vec<UpcomingBirthday>> {
    match annotated(&state, req.chat_id) {
        Ok(mut items) => {
            format::sort_closest(&mut items);
            ok(items
                .iter()
                .map(|i| upcoming(i, format::birthday_line(i)))
                .collect())
        }
        Err(e) => fail(e),
    }
}

// POST /rpc/birthdays/ages
pub async fn list_ages(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> RpcResult<Vec<UpcomingBirthday>> {
    match annotated(&state, req.chat_id) {
        Ok(mut items) => {
            format::sort_calendar(&mut items);
            ok(items
                .iter()
                .map(|i| upcoming(i, format::age_line(i)))
                .collect())
        }
        Err(e) => fail(e),
    }
}

// POST /rpc/birthdays/next
pub async fn next_birthday(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> RpcResult<Option<UpcomingBirthday>> {
    match annotated(&state, req.chat_id) {
        Ok(items) => ok(format::next_occasion(&items)
            .map(|i| upcoming(i, format::next_birthday(i)))),
        Err(e) => fail(e),
    }
}

// POST /rpc/command
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> RpcResult<CommandReply> {
    let Some(cmd) = commands::parse(&req.text, None) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(RpcResponse::err(format!("Unknown command: '{}'", req.text))),
        );
    };
    let ctx = CommandContext {
        chat_id: req.chat_id,
        is_group: req.is_group,
        admin: state.admin_commands,
        db: &state.db,
        today: state.clock.today(),
    };
    match commands::execute(cmd, &ctx) {
        Ok(text) => ok(CommandReply { text }),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(RpcResponse::err(e))),
    }
}

// POST /rpc/trigger
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TriggerRequest>,
) -> RpcResult<TriggerResult> {
    let Some(bot) = state.telegram.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RpcResponse::err("Telegram bot token not configured")),
        );
    };

    let notified = match worker::notify_tick(&state, bot.as_ref(), req.chat_id).await {
        Ok(sent) => sent,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(RpcResponse::err(e))),
    };

    let next = match req.chat_id.or(state.notify_chat_id) {
        Some(chat_id) => match annotated(&state, chat_id) {
            Ok(items) => format::next_occasion(&items)
                .map(|i| upcoming(i, format::next_birthday(i))),
            Err(e) => return fail(e),
        },
        None => None,
    };

    ok(TriggerResult { notified, next })
}

const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

// POST /telegram/webhook
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    if let Some(secret) = &state.webhook_secret {
        let given = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if given != Some(secret.as_str()) {
            log::warn!("[TELEGRAM] Rejected webhook update {} with a bad secret", update.update_id);
            return StatusCode::UNAUTHORIZED;
        }
    }

    match state.telegram.clone() {
        Some(bot) => {
            telegram::handle_update(&state, &bot, update).await;
            StatusCode::OK
        }
        None => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// GET /rpc/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> RpcResult<BirthdayStats> {
    match state.db.get_stats() {
        Ok(s) => ok(s),
        Err(e) => fail(e),
    }
}

// GET /rpc/status
pub async fn status(State(state): State<Arc<AppState>>) -> RpcResult<ServiceStatus> {
    let stats = state.db.get_stats().ok();
    ok(ServiceStatus {
        running: true,
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_birthdays: stats.as_ref().map(|s| s.total_birthdays).unwrap_or(0),
        chat_count: stats.as_ref().map(|s| s.chat_count).unwrap_or(0),
        telegram_enabled: state.telegram.is_some(),
        last_tick_at: state.last_tick_at.lock().await.clone(),
    })
}

// GET /status
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK" }))
}

// POST /rpc/backup/export
pub async fn backup_export(State(state): State<Arc<AppState>>) -> RpcResult<Vec<BackupEntry>> {
    match state.db.list_all() {
        Ok(records) => ok(records
            .into_iter()
            .map(|r| BackupEntry {
                chat_id: r.chat_id,
                name: r.name,
                date: r.date,
                external_id: r.external_id,
                pronoun: r.pronoun,
            })
            .collect()),
        Err(e) => fail(e),
    }
}

// POST /rpc/backup/restore
pub async fn backup_restore(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BackupRestoreRequest>,
) -> RpcResult<usize> {
    match state.db.clear_and_restore(&req.birthdays) {
        Ok(count) => {
            log::info!("Restored {} birthdays from backup", count);
            ok(count)
        }
        Err(e) => fail(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    const CHAT: i64 = -100;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            db: Arc::new(Db::open(":memory:").unwrap()),
            start_time: Instant::now(),
            clock: Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 8)),
            telegram: None,
            admin_commands: false,
            notify_chat_id: None,
            last_tick_at: Arc::new(Mutex::new(None)),
            tick_lock: Mutex::new(()),
            webhook_secret: None,
        })
    }

    async fn add(state: &Arc<AppState>, name: &str, date: &str) -> RpcResult<BirthdayRecord> {
        add_birthday(
            State(state.clone()),
            Json(AddBirthdayRequest {
                chat_id: CHAT,
                name: name.to_string(),
                date: date.to_string(),
                external_id: None,
                pronoun: None,
            }),
        )
        .await
    }

    #[tokio::test]
    async fn test_add_and_list_closest_first() {
        let state = state();
        assert_eq!(add(&state, "Ricardo", "1980-07-01").await.0, StatusCode::OK);
        assert_eq!(add(&state, "Julia", "1986-03-06").await.0, StatusCode::OK);

        let (status, Json(resp)) =
            list_birthdays(State(state.clone()), Json(ChatRequest { chat_id: CHAT })).await;
        assert_eq!(status, StatusCode::OK);
        let items = resp.data.unwrap();
        assert_eq!(items[0].record.name, "Julia");
        assert_eq!(items[1].days_until_next, 182);
        assert_eq!(items[1].turning_age, 44);
        assert_eq!(items[1].line, "01 jul 1980 — Ricardo — 182 dias");
    }

    #[tokio::test]
    async fn test_invalid_date_is_bad_request() {
        let state = state();
        let (status, Json(resp)) = add(&state, "Ricardo", "1980-02-31").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp.error.unwrap().starts_with("Invalid date"));
    }

    #[tokio::test]
    async fn test_ambiguous_remove_reports_count() {
        let state = state();
        add(&state, "Ricardo", "1980-07-01").await;
        add(&state, "Ricardo", "2015-01-20").await;

        let (status, Json(resp)) = remove_birthday(
            State(state.clone()),
            Json(RemoveBirthdayRequest {
                chat_id: CHAT,
                name: "Ricardo".to_string(),
                date: None,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp.error.unwrap().contains("Found 2 birthdays"));
        assert_eq!(state.db.list_birthdays(CHAT).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_next_and_empty_chat() {
        let state = state();
        let (_, Json(empty)) =
            next_birthday(State(state.clone()), Json(ChatRequest { chat_id: CHAT })).await;
        assert!(empty.success);
        assert!(empty.data.unwrap().is_none());

        add(&state, "Ricardo", "1980-07-01").await;
        let (_, Json(resp)) =
            next_birthday(State(state.clone()), Json(ChatRequest { chat_id: CHAT })).await;
        let next = resp.data.unwrap().unwrap();
        assert_eq!(
            next.line,
            "O próximo aniversário é de Ricardo, que faz 44 anos dentro de 182 dias."
        );
    }

    #[tokio::test]
    async fn test_command_endpoint() {
        let state = state();
        let (status, Json(resp)) = run_command(
            State(state.clone()),
            Json(CommandRequest {
                chat_id: CHAT,
                is_group: true,
                text: "/aniversarios".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(resp.data.unwrap().text, commands::NO_BIRTHDAYS);

        let (status, _) = run_command(
            State(state.clone()),
            Json(CommandRequest {
                chat_id: CHAT,
                is_group: true,
                text: "what".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_trigger_without_telegram() {
        let state = state();
        let (status, _) = trigger(State(state.clone()), Json(TriggerRequest::default())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_backup_round_trip_and_status() {
        let state = state();
        add(&state, "Avó Madá", "1951-08-21").await;
        let (_, Json(export)) = backup_export(State(state.clone())).await;
        let entries = export.data.unwrap();
        assert_eq!(entries.len(), 1);

        let (_, Json(restored)) = backup_restore(
            State(state.clone()),
            Json(BackupRestoreRequest { birthdays: entries }),
        )
        .await;
        assert_eq!(restored.data, Some(1));

        let (_, Json(status)) = status(State(state.clone())).await;
        let status = status.data.unwrap();
        assert_eq!(status.total_birthdays, 1);
        assert!(!status.telegram_enabled);
    }

    #[tokio::test]
    async fn test_webhook_requires_configured_secret() {
        let inner = AppState {
            db: Arc::new(Db::open(":memory:").unwrap()),
            start_time: Instant::now(),
            clock: Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 8)),
            telegram: None,
            admin_commands: true,
            notify_chat_id: None,
            last_tick_at: Arc::new(Mutex::new(None)),
            tick_lock: Mutex::new(()),
            webhook_secret: Some("hush".to_string()),
        };
        let update = || -> Update {
            serde_json::from_value(json!({
                "update_id": 1,
                "message": {"chat": {"id": CHAT, "type": "group"}, "text": "/clear"}
            }))
            .unwrap()
        };

        let state = Arc::new(inner);
        let status = telegram_webhook(State(state.clone()), HeaderMap::new(), Json(update())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut wrong = HeaderMap::new();
        wrong.insert(WEBHOOK_SECRET_HEADER, "nope".parse().unwrap());
        let status = telegram_webhook(State(state.clone()), wrong, Json(update())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut right = HeaderMap::new();
        right.insert(WEBHOOK_SECRET_HEADER, "hush".parse().unwrap());
        let status = telegram_webhook(State(state), right, Json(update())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
