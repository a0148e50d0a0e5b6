//! Inline button routing and stale message detection
//!
//! Every feature registers its own button-press handler and all of them see
//! every press. Buttons carry `{"type": <feature tag>, "payload": <option>}`
//! as callback data; a handler parses it with [`ButtonData::parse`] and
//! returns straight away when the tag is not its own.
//!
//! Before touching the message a button is attached to, a handler calls
//! [`assert_message_validity`]. A press on a message the bot can no longer
//! read (sent before a restart and since gone inaccessible, for instance)
//! gets a short answer, loses its keyboard, and stops there with
//! [`MessageInvalid`], which [`guard_button_press`] swallows.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::transport::{Transport, TransportError};
use super::types::{Button, ButtonPressEvent, ChatRef, MessageRef};
use crate::core::error::AppError;

/// Answer shown when a button is pressed on a message that is no longer usable
pub const DEFAULT_INVALID_MESSAGE: &str = "Actions to this message is no longer valid";

/// Answer shown when a handler fails unexpectedly
pub const GENERIC_ERROR_MESSAGE: &str = "Error";

/// Machine-readable part of an inline button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonData {
    /// Feature tag the press is meant for
    #[serde(rename = "type")]
    pub kind: String,
    /// Chosen option or feature-specific sub-action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ButtonData {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Some(payload.into()),
        }
    }

    /// Button data without a payload
    pub fn tag_only(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
        }
    }

    /// Parses the callback data of `event`; `None` if it is missing, not
    /// JSON, or has no `type`
    pub fn parse(event: &ButtonPressEvent) -> Option<Self> {
        Self::from_callback_data(event.data.as_deref()?)
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }

    pub fn to_callback_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Inline button carrying this data
    pub fn button(&self, text: impl Into<String>) -> Button {
        Button::new(text, self.to_callback_data())
    }
}

/// The message a button press came from, known to be usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidMessage {
    pub chat_id: ChatRef,
    pub message_id: MessageRef,
    pub text: String,
}

/// The message behind a button press is missing or has no text
///
/// An expected race (old buttons, messages from before a restart), not an
/// application error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("callback query message is no longer valid")]
pub struct MessageInvalid;

/// Outcome of a button-press handler body
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error(transparent)]
    MessageInvalid(#[from] MessageInvalid),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<TransportError> for CallbackError {
    fn from(err: TransportError) -> Self {
        CallbackError::App(AppError::Transport(err))
    }
}

/// Awaits an outbound call whose failure must not replace the caller's own outcome
pub async fn fire_and_forget<F>(what: &str, call: F)
where
    F: Future<Output = Result<(), TransportError>>,
{
    if let Err(e) = call.await {
        log::error!("Failed to {}: {}", what, e);
    }
}

/// Checks that the pressed button still sits on a message with text
///
/// On failure the press is answered with `on_invalid`, the keyboard of the
/// message (if the message is still referenced) is removed, and
/// [`MessageInvalid`] is returned. Both calls are best effort.
pub async fn assert_message_validity(
    transport: &dyn Transport,
    event: &ButtonPressEvent,
    on_invalid: &str,
) -> Result<ValidMessage, MessageInvalid> {
    if let Some(message) = &event.message {
        if let Some(text) = message.text.as_deref().filter(|text| !text.is_empty()) {
            return Ok(ValidMessage {
                chat_id: message.chat_id,
                message_id: message.message_id,
                text: text.to_string(),
            });
        }
    }

    log::debug!(
        "Callback query {} refers to an invalid message ({:?})",
        event.interaction_id,
        event.message.as_ref().map(|m| (m.chat_id, m.message_id))
    );

    fire_and_forget(
        "answer callback query",
        transport.acknowledge_interaction(&event.interaction_id, Some(on_invalid.to_string())),
    )
    .await;

    if let Some(message) = &event.message {
        fire_and_forget(
            "clear inline keyboard",
            transport.edit_message_controls(message.chat_id, message.message_id, None),
        )
        .await;
    }

    Err(MessageInvalid)
}

/// Handler boundary for button-press bodies
///
/// [`MessageInvalid`] ends the handler quietly. Anything else is logged and
/// the press is answered with a generic error.
pub async fn guard_button_press<F>(transport: &dyn Transport, event: &ButtonPressEvent, body: F)
where
    F: Future<Output = Result<(), CallbackError>>,
{
    match body.await {
        Ok(()) => {}
        Err(CallbackError::MessageInvalid(_)) => {}
        Err(CallbackError::App(e)) => {
            log::error!("Callback query {} failed: {:?}", event.interaction_id, e);
            fire_and_forget(
                "answer callback query",
                transport.acknowledge_interaction(&event.interaction_id, Some(GENERIC_ERROR_MESSAGE.to_string())),
            )
            .await;
        }
    }
}
