//! Telegram bot integration and handlers

pub mod bot;
pub mod callback;
pub mod handlers;
pub mod hidden_payload;
pub mod multiplexer;
pub mod transport;
pub mod types;
pub mod update;

// Re-exports for convenience
pub use bot::{create_bot, delete_webhook, fetch_bot_username, set_webhook, setup_bot_commands, Command};
pub use handlers::{build_dispatcher, BotDispatcher, HandlerDeps};
pub use transport::{TelegramTransport, Transport};
pub use types::{Update, UpdateKind};
pub use update::classify;
