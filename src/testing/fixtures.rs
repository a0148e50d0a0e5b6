//! Builders for inbound updates

use crate::telegram::bot::Command;
use crate::telegram::callback::ButtonData;
use crate::telegram::types::{
    Annotation, ButtonPressEvent, ChatRef, CommandEvent, InboundMessage, MessageRef, OriginMessage, Update,
};

pub fn message(chat_id: ChatRef, message_id: MessageRef, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id,
        message_id,
        text: Some(text.to_string()),
        reply_to: None,
        annotations: Vec::new(),
        has_sticker: false,
    }
}

/// Sticker message; stickers carry no text
pub fn sticker(chat_id: ChatRef, message_id: MessageRef) -> InboundMessage {
    InboundMessage {
        text: None,
        has_sticker: true,
        ..message(chat_id, message_id, "")
    }
}

/// Message as the bot sent it: text plus annotations
pub fn bot_message(chat_id: ChatRef, message_id: MessageRef, text: &str, annotations: Vec<Annotation>) -> InboundMessage {
    InboundMessage {
        annotations,
        ..message(chat_id, message_id, text)
    }
}

/// `message` as a reply to `parent`
pub fn reply(message: InboundMessage, parent: InboundMessage) -> InboundMessage {
    InboundMessage {
        reply_to: Some(Box::new(parent)),
        ..message
    }
}

pub fn plain(message: InboundMessage) -> Update {
    Update::Message(message)
}

/// Command update whose message text is the command as a user would type it
pub fn command(chat_id: ChatRef, message_id: MessageRef, command: Command) -> Update {
    Update::Command(CommandEvent {
        message: message(chat_id, message_id, &command_text(&command)),
        command,
    })
}

fn command_text(command: &Command) -> String {
    let (name, args) = match command {
        Command::Start => ("start", ""),
        Command::Help => ("help", ""),
        Command::Counter => ("counter", ""),
        Command::RockPaperScissors => ("rock_paper_scissors", ""),
        Command::DataSet(args) => ("data_set", args.as_str()),
        Command::DataGet(args) => ("data_get", args.as_str()),
        Command::DataSetJson(args) => ("data_set_json", args.as_str()),
        Command::DataGetJson(args) => ("data_get_json", args.as_str()),
    };
    if args.is_empty() {
        format!("/{}", name)
    } else {
        format!("/{} {}", name, args)
    }
}

pub fn origin(chat_id: ChatRef, message_id: MessageRef, text: Option<&str>) -> OriginMessage {
    OriginMessage {
        chat_id,
        message_id,
        text: text.map(str::to_string),
    }
}

pub fn button_press(interaction_id: &str, origin: Option<OriginMessage>, data: &ButtonData) -> Update {
    Update::ButtonPress(ButtonPressEvent {
        interaction_id: interaction_id.to_string(),
        message: origin,
        data: Some(data.to_callback_data()),
    })
}
