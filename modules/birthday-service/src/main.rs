//! Birthday Bot Service: standalone binary that keeps each chat's birthdays.
//!
//! Hosts an RPC API, a dashboard UI and, when a Telegram token is set, the
//! Telegram bot plus the daily salutation worker.
//! Default: http://127.0.0.1:9103/

mod clock;
mod commands;
mod config;
mod dashboard;
mod db;
mod error;
mod format;
mod recurrence;
mod routes;
mod salutations;
mod telegram;
mod worker;

use routes::AppState;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = config::Config::from_env();

    log::info!("Opening database at: {}", config.db_path);
    let database = match db::Db::open(&config.db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Failed to open database {}: {}", config.db_path, e);
            std::process::exit(1);
        }
    };

    let telegram = match &config.telegram_token {
        Some(token) => match telegram::TelegramBot::connect(token).await {
            Ok(bot) => Some(Arc::new(bot)),
            Err(e) => {
                log::error!("[TELEGRAM] Could not connect, bot disabled: {}", e);
                None
            }
        },
        None => {
            log::warn!("TELEGRAM_BOT_TOKEN not set, Telegram bot and notifications disabled");
            None
        }
    };

    let last_tick_at: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let state = Arc::new(AppState {
        db: database,
        start_time: Instant::now(),
        clock: Arc::new(clock::SystemClock),
        telegram: telegram.clone(),
        admin_commands: config.admin_commands,
        notify_chat_id: config.notify_chat_id,
        last_tick_at,
        tick_lock: Mutex::new(()),
        webhook_secret: config.telegram_webhook_secret.clone(),
    });

    if let Some(bot) = telegram {
        if let Err(e) = bot
            .client
            .set_my_commands(&commands::menu(config.admin_commands))
            .await
        {
            log::warn!("[TELEGRAM] Failed to register command menu: {}", e);
        }

        if config.telegram_webhook {
            log::info!("[TELEGRAM] Using webhook delivery at /telegram/webhook");
            if config.telegram_webhook_secret.is_none() {
                log::warn!("[TELEGRAM] TELEGRAM_WEBHOOK_SECRET not set, webhook requests are not authenticated");
            }
        } else {
            let poll_state = state.clone();
            let poll_bot = bot.clone();
            tokio::spawn(async move {
                telegram::run_polling(poll_state, poll_bot).await;
            });
        }

        let worker_state = state.clone();
        let notifier: Arc<dyn worker::Notifier> = bot.clone();
        let notify_hour = config.notify_hour;
        let poll_interval_secs = config.poll_interval_secs;
        tokio::spawn(async move {
            worker::run_worker(worker_state, notifier, notify_hour, poll_interval_secs).await;
        });
        log::info!(
            "Background worker started (poll interval: {}s)",
            config.poll_interval_secs
        );
    }

    let cors = tower_http::cors::CorsLayer::permissive();

    let app = axum::Router::new()
        .route("/", axum::routing::get(dashboard::dashboard))
        .route("/status", axum::routing::get(routes::health))
        // Birthdays
        .route(
            "/rpc/birthdays/add",
            axum::routing::post(routes::add_birthday),
        )
        .route(
            "/rpc/birthdays/remove",
            axum::routing::post(routes::remove_birthday),
        )
        .route(
            "/rpc/birthdays/clear",
            axum::routing::post(routes::clear_birthdays),
        )
        .route(
            "/rpc/birthdays/list",
            axum::routing::post(routes::list_birthdays),
        )
        .route("/rpc/birthdays/ages", axum::routing::post(routes::list_ages))
        .route(
            "/rpc/birthdays/next",
            axum::routing::post(routes::next_birthday),
        )
        // Commands and notifications
        .route("/rpc/command", axum::routing::post(routes::run_command))
        .route("/rpc/trigger", axum::routing::post(routes::trigger))
        .route(
            "/telegram/webhook",
            axum::routing::post(routes::telegram_webhook),
        )
        // Service
        .route("/rpc/stats", axum::routing::get(routes::stats))
        .route("/rpc/status", axum::routing::get(routes::status))
        .route(
            "/rpc/backup/export",
            axum::routing::post(routes::backup_export),
        )
        .route(
            "/rpc/backup/restore",
            axum::routing::post(routes::backup_restore),
        )
        .with_state(state)
        .layer(cors);

    let addr = format!("127.0.0.1:{}", config.port);
    log::info!("Birthday Bot Service listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
    }
}
