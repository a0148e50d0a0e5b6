use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;

use carrierbot::cli::{Cli, Commands};
use carrierbot::core::web_server::{start_web_server, WebhookState};
use carrierbot::core::{config, init_logger, BotConfig};
use carrierbot::storage::SqliteStore;
use carrierbot::telegram::{
    build_dispatcher, create_bot, delete_webhook, fetch_bot_username, set_webhook, setup_bot_commands, HandlerDeps,
    TelegramTransport,
};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the chosen subcommand.
///
/// # Errors
/// Returns an error if initialization fails (configuration, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = BotConfig::from_env();
    init_logger(
        config
            .as_ref()
            .map_or(config::DEFAULT_LOG_LEVEL, |loaded| loaded.log_level.as_str()),
    );

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let config = config?;

    match cli.command {
        Some(Commands::Serve) | None => run_server(config).await,
        Some(Commands::SetWebhook { url }) => {
            let bot = create_bot(&config)?;
            let Some(url) = url.or(config.webhook_url.clone()) else {
                return Err(anyhow::anyhow!(
                    "No webhook URL: pass --url or set WEBHOOK_URL / the X_FUNCTION_* variables"
                ));
            };
            set_webhook(&bot, &url, config.server_token.as_ref()).await?;
            log::info!("Webhook set");
            Ok(())
        }
        Some(Commands::DeleteWebhook) => {
            let bot = create_bot(&config)?;
            delete_webhook(&bot).await?;
            Ok(())
        }
        Some(Commands::SetCommands) => {
            let bot = create_bot(&config)?;
            setup_bot_commands(&bot).await?;
            log::info!("Bot commands published");
            Ok(())
        }
    }
}

/// Serve the webhook until the process is stopped
async fn run_server(config: BotConfig) -> Result<()> {
    log::info!("Opening key-value store at {}", config.database_path);
    let store = SqliteStore::open(&config.database_path)
        .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", config.database_path, e))?;

    let bot = create_bot(&config)?;
    // Commands addressed to other bots in group chats are told apart by name
    let bot_username = fetch_bot_username(&bot).await?;
    let deps = HandlerDeps::new(Arc::new(TelegramTransport::new(bot)), Arc::new(store));
    let dispatcher = build_dispatcher(deps)?;
    log::info!("Dispatcher ready: {:?}", dispatcher.attached_kinds());

    let BotConfig {
        bind_addr,
        server_token,
        ..
    } = config;
    if server_token.is_none() {
        log::warn!("SERVER_TOKEN is not set; the webhook accepts requests from anyone");
    }

    start_web_server(bind_addr, WebhookState::new(dispatcher, bot_username, server_token)).await
}
