//! Rock, paper, scissors against the bot

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::types::{BotRegistry, HandlerDeps};
use crate::core::error::AppError;
use crate::core::utils::first_line;
use crate::telegram::bot::Command;
use crate::telegram::callback::{assert_message_validity, guard_button_press, ButtonData, CallbackError};
use crate::telegram::transport::Transport;
use crate::telegram::types::{ButtonPressEvent, ChatRef, Controls, MessageRef, OutboundMessage, Update, UpdateKind};

pub const TAG: &str = "rock_paper_scissors";

pub const GAME_INVALID: &str = "Game no longer valid";

/// Rock, paper, scissors; each option beats the one before it
pub const OPTIONS: [&str; 3] = ["✊", "✋", "✌"];

const HEADER: &str = "Rock, paper, scissors...";
const AGAIN: &str = "again";
const PENDING: &str = "...";

/// Pause between showing both moves and announcing the result
pub const REVEAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Even,
    YouWon,
    IWon,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Even => write!(f, "Even!"),
            Outcome::YouWon => write!(f, "You won!"),
            Outcome::IWon => write!(f, "I won!"),
        }
    }
}

/// Result of a round, given indexes into [`OPTIONS`]
pub fn outcome(mine: usize, yours: usize) -> Outcome {
    let yours = if mine > yours { yours + OPTIONS.len() } else { yours };
    match yours - mine {
        0 => Outcome::Even,
        1 => Outcome::YouWon,
        _ => Outcome::IWon,
    }
}

fn board(mine: &str, yours: &str) -> String {
    format!("Me → {} {} ← You", mine, yours)
}

fn options_keyboard() -> Controls {
    Controls::InlineKeyboard(vec![OPTIONS
        .iter()
        .map(|option| ButtonData::new(TAG, *option).button(*option))
        .collect()])
}

pub fn mount(registry: &mut BotRegistry) {
    registry
        .on(UpdateKind::Command, on_command)
        .on(UpdateKind::ButtonPress, on_button_press);
}

async fn on_command(deps: HandlerDeps, update: Arc<Update>) {
    let Some(command) = update.command().filter(|c| c.command == Command::RockPaperScissors) else {
        return;
    };
    let message = &command.message;
    if let Err(e) = start_game(deps.transport.as_ref(), message.chat_id, Some(message.message_id)).await {
        log::error!("Failed to start a game in chat {}: {}", message.chat_id, e);
    }
}

/// Sends a fresh game message with the three options
pub async fn start_game(
    transport: &dyn Transport,
    chat_id: ChatRef,
    reply_to: Option<MessageRef>,
) -> Result<(), AppError> {
    let text = format!("{}\n{}", HEADER, board(OPTIONS[0], OPTIONS[0]));
    let mut message = OutboundMessage::new(chat_id, text).controls(options_keyboard());
    if let Some(reply_to) = reply_to {
        message = message.reply_to(reply_to);
    }
    transport.send_message(message).await?;
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
    if data.payload() == Some(AGAIN) {
        return play_again(transport, event).await;
    }

    let message = assert_message_validity(transport, event, GAME_INVALID).await?;

    let Some(yours) = data.payload().and_then(|p| OPTIONS.iter().position(|option| *option == p)) else {
        // The "..." placeholder shown while the result is pending
        transport.acknowledge_interaction(&event.interaction_id, None).await?;
        return Ok(());
    };
    let mine = rand::thread_rng().gen_range(0..OPTIONS.len());

    let revealed = format!("{}\n{}", first_line(&message.text), board(OPTIONS[mine], OPTIONS[yours]));
    let pending = Controls::InlineKeyboard(vec![vec![ButtonData::tag_only(TAG).button(PENDING)]]);
    transport
        .edit_message_text(message.chat_id, message.message_id, revealed, Some(pending))
        .await?;

    tokio::time::sleep(REVEAL_DELAY).await;

    let result = OutboundMessage::new(message.chat_id, outcome(mine, yours).to_string())
        .reply_to(message.message_id)
        .allow_sending_without_reply()
        .controls(Controls::InlineKeyboard(vec![vec![
            ButtonData::new(TAG, AGAIN).button("Play again")
        ]]));

    let (sent, cleared, acknowledged) = tokio::join!(
        transport.send_message(result),
        transport.edit_message_controls(message.chat_id, message.message_id, None),
        transport.acknowledge_interaction(&event.interaction_id, None),
    );
    sent?;
    cleared?;
    acknowledged?;
    Ok(())
}

async fn play_again(transport: &dyn Transport, event: &ButtonPressEvent) -> Result<(), CallbackError> {
    let Some(chat_id) = event.message.as_ref().map(|message| message.chat_id) else {
        // Nothing left to tell which chat the game was in; this always fails
        assert_message_validity(transport, event, GAME_INVALID).await?;
        return Ok(());
    };

    let (acknowledged, started) = tokio::join!(
        transport.acknowledge_interaction(&event.interaction_id, None),
        start_game(transport, chat_id, None),
    );
    acknowledged?;
    started?;
    Ok(())
}
