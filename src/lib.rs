//! Carrierbot - webhook-driven Telegram bot with stateless inline buttons
//!
//! Buttons and prompts carry everything needed to act on them: callback data
//! names the feature and the chosen option, and prompts hide a JSON payload in
//! an invisible link so a reply can be tied back to the message it is about.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, and the webhook server
//! - `storage`: Key-value store behind the data commands
//! - `telegram`: Update model, dispatch, hidden payloads, and feature handlers
//! - `testing`: Recording transport and update builders for tests

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;
pub mod testing;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, BotConfig};
pub use storage::{KeyValueStore, SqliteStore, StoredValue};
pub use telegram::{build_dispatcher, HandlerDeps, Update, UpdateKind};
