//! Process configuration read from the environment
//!
//! Everything is read once at startup into a [`BotConfig`] that `main` passes
//! down explicitly. A `.env` file is honoured through `dotenvy` before this
//! module is consulted.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Default address the webhook server binds to
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default path of the SQLite file backing the data commands
pub const DEFAULT_DATABASE_PATH: &str = "data.sqlite";

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The required {0} is not set.")]
    Missing(String),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Bot configuration resolved at startup
#[derive(Debug)]
pub struct BotConfig {
    /// Telegram bot token
    pub bot_token: SecretString,
    /// Shared access token protecting the webhook URL
    pub server_token: Option<SecretString>,
    /// Public URL Telegram should deliver updates to
    pub webhook_url: Option<String>,
    /// Address the webhook server listens on
    pub bind_addr: SocketAddr,
    /// SQLite file for the key-value store
    pub database_path: String,
    /// Custom Bot API server base URL
    pub bot_api_url: Option<String>,
    /// Fallback log level
    pub log_level: String,
}

impl BotConfig {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let bot_token = required(
            var("TELEGRAM_BOT_TOKEN")
                .or_else(|| var("BOT_TOKEN"))
                .or_else(|| var("TELOXIDE_TOKEN")),
            "environment variable \"TELEGRAM_BOT_TOKEN\"",
        )?;

        let webhook_url = var("WEBHOOK_URL").or_else(|| {
            cloud_function_trigger_url(
                var("X_FUNCTION_REGION").as_deref(),
                var("X_FUNCTION_PROJECT_ID").as_deref(),
                var("X_FUNCTION_NAME").as_deref(),
            )
            .or_else(|| var("X_FUNCTION_TRIGGER_URL"))
        });

        let mut bind_addr: SocketAddr = parse_var(
            "BIND_ADDR",
            var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;
        if let Some(port) = var("PORT") {
            bind_addr.set_port(parse_var("PORT", port)?);
        }

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            server_token: var("SERVER_TOKEN").map(SecretString::from),
            webhook_url,
            bind_addr,
            database_path: var("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            bot_api_url: var("BOT_API_URL"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| {
        let err = ConfigError::Missing(name.to_string());
        log::error!("Error: {}", err);
        err
    })
}

fn parse_var<T>(name: &str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// URL trigger of the function while running on Google Cloud Functions
///
/// Example: `https://us-central1-proj.cloudfunctions.net/my-function`
pub fn cloud_function_trigger_url(region: Option<&str>, project_id: Option<&str>, name: Option<&str>) -> Option<String> {
    match (region, project_id, name) {
        (Some(region), Some(project_id), Some(name)) => {
            Some(format!("https://{}-{}.cloudfunctions.net/{}", region, project_id, name))
        }
        _ => None,
    }
}
