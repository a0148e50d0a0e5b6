//! Classification of Telegram updates into [`Update`]
//!
//! The webhook deserializes teloxide's [`TgUpdate`]; this module reduces it to
//! the handful of fields the bot reads. Commands are parsed with
//! [`Command`], so a command is only a [`Update::Command`] when it is one of
//! ours and addressed to this bot. Anything else starting with a slash is a
//! plain message.

use teloxide::types::{
    CallbackQuery, MaybeInaccessibleMessage, Message, MessageEntityKind, Update as TgUpdate, UpdateKind as TgUpdateKind,
};
use teloxide::utils::command::{BotCommands, ParseError};

use super::bot::Command;
use super::types::{Annotation, ButtonPressEvent, CommandEvent, InboundMessage, OriginMessage, Update};

/// Classifies `update` for the bot named `bot_username`
///
/// Returns `None` for update types the bot does not handle.
pub fn classify(update: TgUpdate, bot_username: &str) -> Option<Update> {
    match update.kind {
        TgUpdateKind::CallbackQuery(query) => Some(Update::ButtonPress(query.into())),
        TgUpdateKind::Message(message) => Some(classify_message(&message, bot_username)),
        TgUpdateKind::Error(value) => {
            log::warn!("Update {} could not be parsed: {}", update.id.0, value);
            None
        }
        _ => None,
    }
}

fn classify_message(message: &Message, bot_username: &str) -> Update {
    let inbound = InboundMessage::from(message);
    match parse_command(message, bot_username) {
        Some(command) => Update::Command(CommandEvent {
            message: inbound,
            command,
        }),
        None => Update::Message(inbound),
    }
}

/// The command the message starts with, when it is ours and meant for us
fn parse_command(message: &Message, bot_username: &str) -> Option<Command> {
    let text = message.text()?;
    let starts_with_command = message
        .entities()?
        .iter()
        .any(|entity| entity.offset == 0 && matches!(entity.kind, MessageEntityKind::BotCommand));
    if !starts_with_command {
        return None;
    }

    match Command::parse(text, bot_username) {
        Ok(command) => Some(command),
        Err(ParseError::WrongBotName(name)) => {
            log::debug!("Command for @{} in chat {}, not ours", name, message.chat.id);
            None
        }
        Err(e) => {
            log::debug!("Unhandled command in chat {}: {}", message.chat.id, e);
            None
        }
    }
}

impl From<&Message> for InboundMessage {
    fn from(message: &Message) -> Self {
        let annotations = message
            .entities()
            .unwrap_or_default()
            .iter()
            .filter_map(|entity| match &entity.kind {
                MessageEntityKind::TextLink { url } => Some(Annotation {
                    offset: entity.offset,
                    length: entity.length,
                    url: url.to_string(),
                }),
                _ => None,
            })
            .collect();

        Self {
            chat_id: message.chat.id.0,
            message_id: message.id.0,
            text: message.text().map(str::to_string),
            reply_to: message.reply_to_message().map(|reply| Box::new(InboundMessage::from(reply))),
            annotations,
            has_sticker: message.sticker().is_some(),
        }
    }
}

impl From<CallbackQuery> for ButtonPressEvent {
    fn from(query: CallbackQuery) -> Self {
        let message = query.message.map(|message| match message {
            MaybeInaccessibleMessage::Regular(message) => OriginMessage {
                chat_id: message.chat.id.0,
                message_id: message.id.0,
                text: message.text().map(str::to_string),
            },
            // Inaccessible messages keep their reference but lose their content
            MaybeInaccessibleMessage::Inaccessible(message) => OriginMessage {
                chat_id: message.chat.id.0,
                message_id: message.message_id.0,
                text: None,
            },
        });

        Self {
            interaction_id: query.id.0,
            message,
            data: query.data,
        }
    }
}
