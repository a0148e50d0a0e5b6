//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use carrierbot::storage::SqliteStore;
use carrierbot::telegram::types::{Annotation, UpdateKind};
use carrierbot::telegram::{build_dispatcher, classify, BotDispatcher, HandlerDeps};
use carrierbot::testing::RecordingTransport;

pub const CHAT_ID: i64 = 123456789;

/// Username the test bot answers to in `/command@name`
pub const BOT_USERNAME: &str = "carrier_bot";

/// Full handler set over a recording transport and a throwaway SQLite file
pub struct TestBot {
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<SqliteStore>,
    pub dispatcher: BotDispatcher,
    _dir: TempDir,
}

impl TestBot {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("data.sqlite");
        let store = Arc::new(SqliteStore::open(path.to_str().expect("utf-8 path")).expect("open store"));
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher =
            build_dispatcher(HandlerDeps::new(transport.clone(), store.clone())).expect("build dispatcher");

        Self {
            transport,
            store,
            dispatcher,
            _dir: dir,
        }
    }

    /// Deserializes, classifies, and dispatches one update JSON
    pub async fn receive(&self, update: Value) -> Option<UpdateKind> {
        let update = serde_json::from_str(&update.to_string()).expect("update json");
        let update = classify(update, BOT_USERNAME)?;
        self.dispatcher.dispatch(update).await
    }
}

fn chat_json() -> Value {
    json!({"id": CHAT_ID, "type": "private", "first_name": "Test", "username": "testuser"})
}

fn user_json() -> Value {
    json!({"id": CHAT_ID, "is_bot": false, "first_name": "Test", "username": "testuser"})
}

fn entity_json(kind: &str, offset: usize, length: usize, url: Option<&str>) -> Value {
    let mut entity = json!({"type": kind, "offset": offset, "length": length});
    if let Some(url) = url {
        entity["url"] = json!(url);
    }
    entity
}

/// Message JSON as Telegram delivers it
pub fn message_json(message_id: i32, text: &str) -> Value {
    let mut message = json!({
        "message_id": message_id,
        "date": 1700000000,
        "chat": chat_json(),
        "from": user_json(),
        "text": text,
    });
    if text.starts_with('/') {
        let length = text.find(' ').unwrap_or(text.len());
        message["entities"] = json!([entity_json("bot_command", 0, length, None)]);
    }
    message
}

/// Message sent by the bot, with its annotations as `text_link` entities
pub fn bot_message_json(message_id: i32, text: &str, annotations: &[Annotation]) -> Value {
    json!({
        "message_id": message_id,
        "date": 1700000000,
        "chat": chat_json(),
        "from": {"id": 1, "is_bot": true, "first_name": "Carrier", "username": BOT_USERNAME},
        "text": text,
        "entities": annotations
            .iter()
            .map(|a| entity_json("text_link", a.offset, a.length, Some(&a.url)))
            .collect::<Vec<_>>(),
    })
}

/// Sticker message as Telegram delivers it
pub fn sticker_json(message_id: i32) -> Value {
    json!({
        "message_id": message_id,
        "date": 1700000000,
        "chat": chat_json(),
        "from": user_json(),
        "sticker": {
            "width": 512,
            "height": 512,
            "emoji": "😀",
            "set_name": "AdvenTimeAnim",
            "is_animated": false,
            "is_video": false,
            "type": "regular",
            "file_id": "CAACAgIAAxkBAAESLdBjMImep-J0W8XaTN6S_Lz1-j1QIQACIwADsND4DGmmygHGlyggKQQ",
            "file_unique_id": "AgADIwADsND4DA",
            "file_size": 16639
        }
    })
}

pub fn message_update(update_id: i64, message: Value) -> Value {
    json!({"update_id": update_id, "message": message})
}

pub fn reply_update(update_id: i64, message_id: i32, text: &str, parent: Value) -> Value {
    let mut message = message_json(message_id, text);
    message["reply_to_message"] = parent;
    message_update(update_id, message)
}

/// Button press on a message the bot can still read
pub fn button_press_update(update_id: i64, message: Value, data: &str) -> Value {
    json!({
        "update_id": update_id,
        "callback_query": {
            "id": format!("cb-{}", update_id),
            "from": user_json(),
            "chat_instance": "42",
            "message": message,
            "data": data,
        }
    })
}

/// Button press on a message that has become inaccessible (`date` is 0)
pub fn stale_button_press_update(update_id: i64, message_id: i32, data: &str) -> Value {
    let message = json!({
        "message_id": message_id,
        "date": 0,
        "chat": chat_json(),
    });
    button_press_update(update_id, message, data)
}
