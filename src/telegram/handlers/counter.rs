//! Counter message with ➖ / Set / ➕ buttons
//!
//! "Set" asks for a number with a force-reply prompt. The prompt carries a
//! hidden payload pointing back at the counter message, so the reply can be
//! matched to the counter without any server-side state.

use std::sync::Arc;

use super::types::{BotRegistry, HandlerDeps};
use crate::core::error::AppError;
use crate::core::utils::parse_leading_int;
use crate::telegram::bot::Command;
use crate::telegram::callback::{
    assert_message_validity, guard_button_press, ButtonData, CallbackError, ValidMessage, DEFAULT_INVALID_MESSAGE,
};
use crate::telegram::hidden_payload::{self, Payload};
use crate::telegram::transport::Transport;
use crate::telegram::types::{ButtonPressEvent, CommandEvent, Controls, InboundMessage, OutboundMessage, Update, UpdateKind};

/// Feature tag in button data and hidden payloads
pub const TAG: &str = "counter";

pub const SET_PROMPT: &str = "What number do you want to set to?";

const DECREMENT: &str = "➖";
const INCREMENT: &str = "➕";
const SET: &str = "set";

/// Keyboard shown under every counter message
pub fn keyboard() -> Controls {
    Controls::InlineKeyboard(vec![vec![
        ButtonData::new(TAG, DECREMENT).button(DECREMENT),
        ButtonData::new(TAG, SET).button("Set"),
        ButtonData::new(TAG, INCREMENT).button(INCREMENT),
    ]])
}

pub fn mount(registry: &mut BotRegistry) {
    registry
        .on(UpdateKind::Command, on_command)
        .on(UpdateKind::ButtonPress, on_button_press)
        .on(UpdateKind::Message, on_message);
}

async fn on_command(deps: HandlerDeps, update: Arc<Update>) {
    let Some(command) = update.command().filter(|c| c.command == Command::Counter) else {
        return;
    };
    if let Err(e) = send_counter(deps.transport.as_ref(), command).await {
        log::error!("Failed to send counter: {}", e);
    }
}

async fn send_counter(transport: &dyn Transport, command: &CommandEvent) -> Result<(), AppError> {
    transport
        .send_message(OutboundMessage::new(command.message.chat_id, "0").controls(keyboard()))
        .await?;
    Ok(())
}

async fn on_button_press(deps: HandlerDeps, update: Arc<Update>) {
    let Some(event) = update.button_press() else {
        return;
    };
    let Some(data) = ButtonData::parse(event).filter(|data| data.is(TAG)) else {
        return;
    };
    let transport = deps.transport.as_ref();
    guard_button_press(transport, event, handle_press(transport, event, &data)).await;
}

async fn handle_press(transport: &dyn Transport, event: &ButtonPressEvent, data: &ButtonData) -> Result<(), CallbackError> {
    let message = assert_message_validity(transport, event, DEFAULT_INVALID_MESSAGE).await?;

    if data.payload() == Some(SET) {
        return prompt_for_value(transport, event, &message).await;
    }

    let next = match (parse_leading_int(&message.text), data.payload()) {
        (Some(current), Some(INCREMENT)) => current.saturating_add(1),
        (Some(current), Some(DECREMENT)) => current.saturating_sub(1),
        (Some(current), _) => current,
        (None, _) => 0,
    };

    let (edited, acknowledged) = tokio::join!(
        transport.edit_message_text(message.chat_id, message.message_id, next.to_string(), Some(keyboard())),
        transport.acknowledge_interaction(&event.interaction_id, None),
    );
    edited?;
    acknowledged?;
    Ok(())
}

async fn prompt_for_value(
    transport: &dyn Transport,
    event: &ButtonPressEvent,
    counter: &ValidMessage,
) -> Result<(), CallbackError> {
    let payload = Payload::new()
        .with("type", TAG)
        .with("action", SET)
        .with("message_id", counter.message_id)
        .with("chat_id", counter.chat_id);
    let (text, annotation) = hidden_payload::encode(SET_PROMPT, &payload);

    let prompt = OutboundMessage::new(counter.chat_id, text)
        .annotation(annotation)
        .reply_to(counter.message_id)
        .controls(Controls::ForceReply);

    let (sent, acknowledged) = tokio::join!(
        transport.send_message(prompt),
        transport.acknowledge_interaction(&event.interaction_id, None),
    );
    sent?;
    acknowledged?;
    Ok(())
}

async fn on_message(deps: HandlerDeps, update: Arc<Update>) {
    let Some(message) = update.message() else {
        return;
    };
    let Some(payload) = message.reply_to_message().and_then(hidden_payload::decode) else {
        return;
    };
    if payload.get_str("type") != Some(TAG) {
        return;
    }
    if let Err(e) = handle_reply(deps.transport.as_ref(), message, &payload).await {
        log::error!("Failed to handle counter reply in chat {}: {}", message.chat_id, e);
    }
}

async fn handle_reply(transport: &dyn Transport, message: &InboundMessage, payload: &Payload) -> Result<(), AppError> {
    match payload.get_str("action") {
        Some(SET) => set_value(transport, message, payload).await,
        other => {
            log::warn!("Unknown counter action {:?} in hidden payload", other);
            Ok(())
        }
    }
}

async fn set_value(transport: &dyn Transport, message: &InboundMessage, payload: &Payload) -> Result<(), AppError> {
    let chat_id = payload.get_i64("chat_id");
    let counter_id = payload.get_i64("message_id").and_then(|id| i32::try_from(id).ok());
    let Some((chat_id, counter_id)) = chat_id.zip(counter_id) else {
        return Err(AppError::Validation("counter payload lacks its message reference".to_string()));
    };

    // Payloads are user-forgeable: only counters in this chat can be touched
    if chat_id != message.chat_id {
        log::warn!(
            "Ignoring counter payload for chat {} received in chat {}",
            chat_id,
            message.chat_id
        );
        return Ok(());
    }

    let Some(value) = parse_leading_int(message.text_or_empty()) else {
        transport
            .send_message(OutboundMessage::new(message.chat_id, "Invalid number").reply_to(message.message_id))
            .await?;
        return Ok(());
    };

    let (edited, replied) = tokio::join!(
        transport.edit_message_text(chat_id, counter_id, value.to_string(), Some(keyboard())),
        transport.send_message(
            OutboundMessage::new(message.chat_id, format!("Counter has been set to {}", value)).reply_to(counter_id)
        ),
    );
    edited?;
    replied?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::testing::fixtures;
    use crate::testing::{RecordingTransport, TransportCall};
    use pretty_assertions::assert_eq;

    fn deps() -> (Arc<RecordingTransport>, HandlerDeps) {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let deps = HandlerDeps::new(transport.clone(), store);
        (transport, deps)
    }

    fn press(payload: &str, text: Option<&str>) -> Arc<Update> {
        Arc::new(fixtures::button_press(
            "q1",
            Some(fixtures::origin(5, 77, text)),
            &ButtonData::new(TAG, payload),
        ))
    }

    #[tokio::test]
    async fn test_command_sends_zero_with_keyboard() {
        let (transport, deps) = deps();
        on_command(deps, Arc::new(fixtures::command(5, 1, Command::Counter))).await;

        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "0");
        assert_eq!(sent[0].controls, Some(keyboard()));
    }

    #[tokio::test]
    async fn test_other_commands_ignored() {
        let (transport, deps) = deps();
        on_command(deps, Arc::new(fixtures::command(5, 1, Command::Help))).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let (transport, deps) = deps();
        on_button_press(deps.clone(), press(INCREMENT, Some("41"))).await;
        on_button_press(deps, press(DECREMENT, Some("-3"))).await;

        assert_eq!(
            transport.text_edits(),
            vec![(5, 77, "42".to_string()), (5, 77, "-4".to_string())]
        );
        assert_eq!(transport.acknowledgements(), vec![None, None]);
    }

    #[tokio::test]
    async fn test_non_numeric_counter_resets_to_zero() {
        let (transport, deps) = deps();
        on_button_press(deps, press(INCREMENT, Some("lots"))).await;
        assert_eq!(transport.text_edits(), vec![(5, 77, "0".to_string())]);
    }

    #[tokio::test]
    async fn test_foreign_tag_ignored() {
        let (transport, deps) = deps();
        let update = fixtures::button_press(
            "q1",
            Some(fixtures::origin(5, 77, Some("1"))),
            &ButtonData::new("rock_paper_scissors", INCREMENT),
        );
        on_button_press(deps, Arc::new(update)).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_press_on_inaccessible_message() {
        let (transport, deps) = deps();
        on_button_press(deps, press(INCREMENT, None)).await;

        assert_eq!(
            transport.acknowledgements(),
            vec![Some(DEFAULT_INVALID_MESSAGE.to_string())]
        );
        assert_eq!(transport.control_edits(), vec![(5, 77, None)]);
        assert!(transport.text_edits().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_answers_error() {
        let (transport, deps) = deps();
        transport.set_failing(true);
        on_button_press(deps, press(INCREMENT, Some("1"))).await;

        let acks = transport.acknowledgements();
        assert_eq!(acks.last(), Some(&Some("Error".to_string())));
    }

    #[tokio::test]
    async fn test_set_sends_prompt_with_hidden_payload() {
        let (transport, deps) = deps();
        on_button_press(deps, press(SET, Some("3"))).await;

        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        let prompt = &sent[0];
        assert_eq!(prompt.controls, Some(Controls::ForceReply));
        assert_eq!(prompt.reply_to, Some(77));
        assert!(prompt.text.ends_with(SET_PROMPT));

        let decoded = hidden_payload::decode_annotations(&prompt.annotations).unwrap();
        assert_eq!(decoded.get_str("type"), Some(TAG));
        assert_eq!(decoded.get_str("action"), Some(SET));
        assert_eq!(decoded.get_i64("message_id"), Some(77));
        assert_eq!(decoded.get_i64("chat_id"), Some(5));
    }

    fn reply_to_prompt(chat_id: i64, payload: &Payload, text: &str) -> Arc<Update> {
        let (prompt_text, annotation) = hidden_payload::encode(SET_PROMPT, payload);
        let prompt = fixtures::bot_message(chat_id, 78, &prompt_text, vec![annotation]);
        Arc::new(fixtures::plain(fixtures::reply(fixtures::message(chat_id, 79, text), prompt)))
    }

    fn set_payload(chat_id: i64) -> Payload {
        Payload::new()
            .with("type", TAG)
            .with("action", SET)
            .with("message_id", 77_i32)
            .with("chat_id", chat_id)
    }

    #[tokio::test]
    async fn test_reply_sets_counter() {
        let (transport, deps) = deps();
        on_message(deps, reply_to_prompt(5, &set_payload(5), "15")).await;

        assert_eq!(transport.text_edits(), vec![(5, 77, "15".to_string())]);
        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Counter has been set to 15");
        assert_eq!(sent[0].reply_to, Some(77));
    }

    #[tokio::test]
    async fn test_reply_with_invalid_number() {
        let (transport, deps) = deps();
        on_message(deps, reply_to_prompt(5, &set_payload(5), "fifteen")).await;

        assert!(transport.text_edits().is_empty());
        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Invalid number");
        assert_eq!(sent[0].reply_to, Some(79));
    }

    #[tokio::test]
    async fn test_reply_with_payload_for_other_chat_ignored() {
        let (transport, deps) = deps();
        on_message(deps, reply_to_prompt(5, &set_payload(6), "15")).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reply_to_plain_message_ignored() {
        let (transport, deps) = deps();
        let parent = fixtures::message(5, 78, "just text");
        let update = fixtures::plain(fixtures::reply(fixtures::message(5, 79, "15"), parent));
        on_message(deps, Arc::new(update)).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_payload_of_other_feature_ignored() {
        let (transport, deps) = deps();
        let payload = Payload::new().with("type", "survey");
        on_message(deps, reply_to_prompt(5, &payload, "15")).await;
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_edit_keeps_keyboard() {
        let (transport, deps) = deps();
        on_message(deps, reply_to_prompt(5, &set_payload(5), "2")).await;

        let edit = transport
            .calls()
            .into_iter()
            .find(|call| matches!(call, TransportCall::EditMessageText { .. }));
        assert_eq!(
            edit,
            Some(TransportCall::EditMessageText {
                chat_id: 5,
                message_id: 77,
                text: "2".to_string(),
                controls: Some(keyboard()),
            })
        );
    }
}
