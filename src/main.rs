mod config;
mod referral;

use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use config::Config;
use referral::{BotState, Command, Ledger, RewardNotifier, TelegramClient, handle_command, handle_new_members};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "davatbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("davatbot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting davatbot...");
    info!("Loaded config from {config_path}");
    info!("Tracked group: {}", config.group_chat_id);
    info!("Referral threshold: {}", config.referral_threshold);

    // The bot's own identity: needed to skip self-joins and to format deep links.
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            warn!("Failed to get bot info (bad token?): {e}");
            std::process::exit(1);
        }
    };
    info!("Bot user ID: {}, username: @{}", me.id, me.username());
    let bot_user_id = me.id.0 as i64;
    let bot_username = me.username().to_string();

    let ledger = match Ledger::open(&config.data_dir.join("bot_data.db")) {
        Ok(l) => l,
        Err(e) => {
            warn!("Failed to open ledger database: {e}");
            std::process::exit(1);
        }
    };

    let reward = RewardNotifier::new(config.reward_image_url.clone());
    let state = Arc::new(BotState {
        config,
        ledger,
        telegram: TelegramClient::new(bot.clone()),
        reward,
        bot_user_id,
        bot_username,
    });

    let handler = dptree::entry().branch(
        Update::filter_message()
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(handle_command),
            )
            .branch(
                dptree::filter(|msg: Message| msg.new_chat_members().is_some())
                    .endpoint(handle_new_members),
            ),
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Update caused error"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
