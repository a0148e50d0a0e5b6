//! /start, /help and small talk

use std::sync::Arc;

use teloxide::utils::command::BotCommands;

use super::types::{BotRegistry, HandlerDeps};
use crate::telegram::bot::Command;
use crate::telegram::types::{InboundMessage, OutboundMessage, Update, UpdateKind};

pub fn mount(registry: &mut BotRegistry) {
    registry
        .on(UpdateKind::Command, on_command)
        .on(UpdateKind::Message, on_message);
}

/// One `/command - description` line per menu entry
pub fn help_text() -> String {
    Command::bot_commands()
        .into_iter()
        .map(|entry| format!("{} - {}", entry.command, entry.description))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn on_command(deps: HandlerDeps, update: Arc<Update>) {
    let Some(command) = update.command() else {
        return;
    };
    let text = match command.command {
        Command::Start => "Welcome".to_string(),
        Command::Help => help_text(),
        _ => return,
    };

    let chat_id = command.message.chat_id;
    if let Err(e) = deps.transport.send_message(OutboundMessage::new(chat_id, text)).await {
        log::error!("Failed to answer {:?} in chat {}: {}", command.command, chat_id, e);
    }
}

/// Small-talk answer to a plain message, if it gets one
fn small_talk(message: &InboundMessage) -> Option<&'static str> {
    if message.has_sticker {
        return Some("👍");
    }
    match message.text.as_deref() {
        Some("hi") => Some("Hey there"),
        _ => None,
    }
}

async fn on_message(deps: HandlerDeps, update: Arc<Update>) {
    let Some(message) = update.message() else {
        return;
    };
    let Some(answer) = small_talk(message) else {
        return;
    };
    if let Err(e) = deps
        .transport
        .send_message(OutboundMessage::new(message.chat_id, answer))
        .await
    {
        log::error!("Failed to answer chat {}: {}", message.chat_id, e);
    }
}
