//! "Set" on a counter: prompt with a hidden payload, then a reply to it

mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

use carrierbot::telegram::handlers::counter;
use carrierbot::telegram::hidden_payload::{self, Payload, ZERO_WIDTH_SPACE};
use carrierbot::telegram::types::{Annotation, Controls};
use carrierbot::testing::TransportCall;

/// Presses "Set" on counter message 20 and returns the prompt as Telegram would echo it back
async fn press_set(bot: &TestBot) -> serde_json::Value {
    let data = json!({"type": "counter", "payload": "set"}).to_string();
    bot.receive(button_press_update(1, bot_message_json(20, "5", &[]), &data))
        .await;

    let sent = bot.transport.sent_messages();
    assert_eq!(sent.len(), 1);
    let prompt = &sent[0];
    bot.transport.clear();

    bot_message_json(1000, &prompt.text, &prompt.annotations)
}

#[tokio::test]
async fn test_prompt_shape() {
    let bot = TestBot::new();
    let data = json!({"type": "counter", "payload": "set"}).to_string();
    bot.receive(button_press_update(1, bot_message_json(20, "5", &[]), &data))
        .await;

    let sent = bot.transport.sent_messages();
    let prompt = &sent[0];
    assert_eq!(prompt.text, format!("{}{}", ZERO_WIDTH_SPACE, counter::SET_PROMPT));
    assert_eq!(prompt.controls, Some(Controls::ForceReply));
    assert_eq!(prompt.reply_to, Some(20));
    assert_eq!(prompt.annotations.len(), 1);

    let annotation = &prompt.annotations[0];
    assert_eq!((annotation.offset, annotation.length), (0, 1));
    assert!(annotation.url.starts_with("http://x-bot-payload.invalid/"));

    let payload = hidden_payload::decode_annotations(&prompt.annotations).unwrap();
    assert_eq!(payload.get_str("type"), Some("counter"));
    assert_eq!(payload.get_str("action"), Some("set"));
    assert_eq!(payload.get_i64("message_id"), Some(20));
    assert_eq!(payload.get_i64("chat_id"), Some(CHAT_ID));
}

#[tokio::test]
async fn test_reply_sets_counter() {
    let bot = TestBot::new();
    let prompt = press_set(&bot).await;

    bot.receive(reply_update(2, 30, "12", prompt)).await;

    assert_eq!(
        bot.transport.calls(),
        vec![
            TransportCall::EditMessageText {
                chat_id: CHAT_ID,
                message_id: 20,
                text: "12".to_string(),
                controls: Some(counter::keyboard()),
            },
            TransportCall::SendMessage(
                carrierbot::telegram::types::OutboundMessage::new(CHAT_ID, "Counter has been set to 12").reply_to(20)
            ),
        ]
    );
}

#[tokio::test]
async fn test_reply_with_garbage() {
    let bot = TestBot::new();
    let prompt = press_set(&bot).await;

    bot.receive(reply_update(2, 30, "twelve", prompt)).await;

    let sent = bot.transport.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "Invalid number");
    assert_eq!(sent[0].reply_to, Some(30));
    assert!(bot.transport.text_edits().is_empty());
}

#[tokio::test]
async fn test_command_reply_is_not_a_counter_value() {
    let bot = TestBot::new();
    let prompt = press_set(&bot).await;

    // Commands are claimed before message handlers see them
    let mut reply = message_json(30, "/start");
    reply["reply_to_message"] = prompt;
    bot.receive(message_update(2, reply)).await;

    assert!(bot.transport.text_edits().is_empty());
    assert_eq!(bot.transport.sent_messages()[0].text, "Welcome");
}

#[tokio::test]
async fn test_unknown_command_reply_is_an_invalid_number() {
    let bot = TestBot::new();
    let prompt = press_set(&bot).await;

    // Not one of the bot's commands, so the counter sees it as a reply
    let mut reply = message_json(30, "/cancel");
    reply["reply_to_message"] = prompt;
    bot.receive(message_update(2, reply)).await;

    let sent = bot.transport.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text, "Invalid number");
    assert_eq!(sent[0].reply_to, Some(30));
    assert!(bot.transport.text_edits().is_empty());
}

#[tokio::test]
async fn test_truncated_payload_is_ignored() {
    let bot = TestBot::new();
    let annotation = Annotation {
        offset: 0,
        length: 1,
        url: "http://x-bot-payload.invalid/%7B%22type%22%3A%22coun".to_string(),
    };
    let prompt = bot_message_json(1000, &format!("{}{}", ZERO_WIDTH_SPACE, counter::SET_PROMPT), &[annotation]);

    bot.receive(reply_update(2, 30, "12", prompt)).await;

    assert!(bot.transport.calls().is_empty());
}

#[tokio::test]
async fn test_payload_pointing_at_another_chat_is_ignored() {
    let bot = TestBot::new();
    let payload = Payload::new()
        .with("type", "counter")
        .with("action", "set")
        .with("message_id", 20_i32)
        .with("chat_id", CHAT_ID + 1);
    let (text, annotation) = hidden_payload::encode(counter::SET_PROMPT, &payload);
    let prompt = bot_message_json(1000, &text, &[annotation]);

    bot.receive(reply_update(2, 30, "12", prompt)).await;

    assert!(bot.transport.calls().is_empty());
}

#[tokio::test]
async fn test_reply_to_message_without_payload() {
    let bot = TestBot::new();
    let parent = bot_message_json(1000, "What number do you want to set to?", &[]);

    bot.receive(reply_update(2, 30, "12", parent)).await;

    assert!(bot.transport.calls().is_empty());
}
