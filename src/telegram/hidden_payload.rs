//! Hidden payloads carried inside bot messages
//!
//! The bot keeps no session store. When it asks a question whose answer needs
//! context on the next turn (which counter to set, for example), that context
//! travels inside the question itself: a zero width space is prepended to the
//! text and a `text_link` annotation over that single character points to
//! `http://x-bot-payload.invalid/<percent-encoded JSON>`. The user sees only
//! the text. When they reply, Telegram includes the original message, with
//! its annotations, as `reply_to_message`, and [`decode`] recovers the payload.
//!
//! ```
//! use carrierbot::telegram::hidden_payload::{self, Payload};
//!
//! let payload = Payload::new().with("type", "counter").with("action", "set");
//! let (text, annotation) = hidden_payload::encode("What number?", &payload);
//! assert!(text.ends_with("What number?"));
//! assert_eq!(hidden_payload::decode_annotations(&[annotation]), Some(payload));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Annotation, InboundMessage};

/// Invisible character the payload annotation is anchored to
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// URL prefix reserved for hidden payload annotations
pub const PAYLOAD_URL_PREFIX: &str = "http://x-bot-payload.invalid/";

/// A value stored in a [`Payload`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Object(Payload),
}

/// String-keyed mapping of numbers, strings, booleans and nested payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, PayloadValue>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PayloadValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            PayloadValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer lookup; numeric strings are accepted too
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            PayloadValue::Number(n) => n.as_i64(),
            PayloadValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            PayloadValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_object(&self, key: &str) -> Option<&Payload> {
        match self.get(key)? {
            PayloadValue::Object(p) => Some(p),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON form
    pub fn to_json(&self) -> String {
        // A map of strings, numbers, booleans and maps always serializes
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<bool> for PayloadValue {
    fn from(value: bool) -> Self {
        PayloadValue::Bool(value)
    }
}

impl From<i64> for PayloadValue {
    fn from(value: i64) -> Self {
        PayloadValue::Number(value.into())
    }
}

impl From<i32> for PayloadValue {
    fn from(value: i32) -> Self {
        PayloadValue::Number(value.into())
    }
}

impl From<u64> for PayloadValue {
    fn from(value: u64) -> Self {
        PayloadValue::Number(value.into())
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        PayloadValue::String(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        PayloadValue::String(value)
    }
}

impl From<Payload> for PayloadValue {
    fn from(value: Payload) -> Self {
        PayloadValue::Object(value)
    }
}

/// A payload annotation was found but could not be read back
///
/// These are logged by [`decode`]: unlike a plain miss they mean a message the
/// bot produced (or something pretending to be one) was damaged.
#[derive(Debug, Error)]
pub enum HiddenPayloadError {
    #[error("Cannot get payload string from: \"{0}\"")]
    MissingSegment(String),

    #[error("Malformed percent escape at byte {0} of the payload")]
    MalformedEscape(usize),

    #[error("Payload is not valid percent-encoded UTF-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("Payload is not a valid JSON object: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Prepends the invisible anchor character to `text`
pub fn with_hidden_payload(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + ZERO_WIDTH_SPACE.len_utf8());
    out.push(ZERO_WIDTH_SPACE);
    out.push_str(text);
    out
}

/// Builds the annotation carrying `payload`, anchored at offset 0, length 1
pub fn payload_annotation(payload: &Payload) -> Annotation {
    Annotation {
        offset: 0,
        length: 1,
        url: format!("{}{}", PAYLOAD_URL_PREFIX, urlencoding::encode(&payload.to_json())),
    }
}

/// Encodes `payload` into `text`
///
/// Returns the text to send and the annotation that must be sent with it as
/// part of the same message.
pub fn encode(text: &str, payload: &Payload) -> (String, Annotation) {
    (with_hidden_payload(text), payload_annotation(payload))
}

/// Looks for a hidden payload annotation and parses it
///
/// `Ok(None)` when no annotation uses the reserved prefix.
pub fn try_decode_annotations(annotations: &[Annotation]) -> Result<Option<Payload>, HiddenPayloadError> {
    let Some(annotation) = annotations.iter().find(|a| a.url.starts_with(PAYLOAD_URL_PREFIX)) else {
        return Ok(None);
    };

    let segment = &annotation.url[PAYLOAD_URL_PREFIX.len()..];
    if segment.is_empty() {
        return Err(HiddenPayloadError::MissingSegment(annotation.url.clone()));
    }

    check_escapes(segment)?;
    let json = urlencoding::decode(segment)?;
    Ok(Some(serde_json::from_str(&json)?))
}

/// Every `%` must start a two-digit hex escape
///
/// `urlencoding::decode` keeps broken escapes as literal text, which would
/// let a damaged payload decode into a different one.
fn check_escapes(segment: &str) -> Result<(), HiddenPayloadError> {
    let bytes = segment.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b'%' {
            continue;
        }
        let escape = bytes.get(index + 1..index + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(HiddenPayloadError::MalformedEscape(index));
        }
    }
    Ok(())
}

/// Like [`try_decode_annotations`], but logs corrupt payloads and maps them to `None`
pub fn decode_annotations(annotations: &[Annotation]) -> Option<Payload> {
    match try_decode_annotations(annotations) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("Error occurred while decoding hidden payload in message: {}", e);
            None
        }
    }
}

/// Hidden payload of `message`, if it carries a readable one
pub fn decode(message: &InboundMessage) -> Option<Payload> {
    decode_annotations(&message.annotations)
}
