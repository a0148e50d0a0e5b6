use thiserror::Error;

use crate::core::config::ConfigError;
use crate::storage::StoreError;
use crate::telegram::transport::TransportError;

/// Centralized error type for the application
///
/// Handler bodies, bootstrap code and the CLI convert their failures into this
/// enum. Errors that carry their own meaning for control flow
/// (`MessageInvalid`, `HiddenPayloadError`) live next to the code that raises
/// them.
///
/// # Example
///
/// ```no_run
/// use carrierbot::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors raised outside the `Transport` seam (webhook setup, commands menu)
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Outbound message transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Key-value store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_from_str() {
        let err: AppError = "unexpected button payload".into();
        assert_eq!(err.to_string(), "Validation error: unexpected button payload");
    }

    #[test]
    fn test_config_error_is_wrapped() {
        let err: AppError = ConfigError::Missing("TELEGRAM_BOT_TOKEN".to_string()).into();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }
}
