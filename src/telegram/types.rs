//! Update and message types handled by the bot
//!
//! Telegram updates are classified into [`Update`] at the webhook boundary
//! (see [`super::update`]); everything past that point works with these
//! typed variants only.

use serde::{Deserialize, Serialize};

use super::bot::Command;

/// Chat identifier
pub type ChatRef = i64;

/// Message identifier within a chat
pub type MessageRef = i32;

/// A link-like annotation over a span of message text (Telegram `text_link` entity)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Offset in UTF-16 code units
    pub offset: usize,
    /// Length in UTF-16 code units
    pub length: usize,
    /// Destination URL
    pub url: String,
}

/// Message received from a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatRef,
    pub message_id: MessageRef,
    pub text: Option<String>,
    pub reply_to: Option<Box<InboundMessage>>,
    pub annotations: Vec<Annotation>,
    pub has_sticker: bool,
}

impl InboundMessage {
    /// Visible text, empty when the message carries none
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// The message this one replies to
    pub fn reply_to_message(&self) -> Option<&InboundMessage> {
        self.reply_to.as_deref()
    }
}

/// Message an inline button was attached to
///
/// `text` is `None` when the Bot API only reports a reference to the message
/// (too old, deleted content, or a message without text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginMessage {
    pub chat_id: ChatRef,
    pub message_id: MessageRef,
    pub text: Option<String>,
}

/// Inline button press (Telegram callback query)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPressEvent {
    pub interaction_id: String,
    pub message: Option<OriginMessage>,
    pub data: Option<String>,
}

/// Bot command such as `/counter` or `/data_get foo`, addressed to this bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEvent {
    pub message: InboundMessage,
    pub command: Command,
}

/// Update categories a handler can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateKind {
    ButtonPress,
    Command,
    Message,
}

impl UpdateKind {
    /// Order in which kinds are attached to the dispatcher. `Message` claims
    /// every message, so it has to come after everything more specific.
    pub const ATTACH_ORDER: [UpdateKind; 3] = [UpdateKind::ButtonPress, UpdateKind::Command, UpdateKind::Message];

    /// Whether an update of this shape can be delivered to handlers of this kind
    pub fn claims(self, update: &Update) -> bool {
        match (self, update) {
            (UpdateKind::ButtonPress, Update::ButtonPress(_)) => true,
            (UpdateKind::Command, Update::Command(_)) => true,
            (UpdateKind::Message, Update::Message(_) | Update::Command(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UpdateKind::ButtonPress => "callback_query",
            UpdateKind::Command => "command",
            UpdateKind::Message => "message",
        };
        f.write_str(name)
    }
}

/// A classified inbound update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    ButtonPress(ButtonPressEvent),
    Message(InboundMessage),
    Command(CommandEvent),
}

impl Update {
    /// The message carried by a plain message or a command
    pub fn message(&self) -> Option<&InboundMessage> {
        match self {
            Update::Message(msg) => Some(msg),
            Update::Command(cmd) => Some(&cmd.message),
            Update::ButtonPress(_) => None,
        }
    }

    pub fn button_press(&self) -> Option<&ButtonPressEvent> {
        match self {
            Update::ButtonPress(event) => Some(event),
            _ => None,
        }
    }

    pub fn command(&self) -> Option<&CommandEvent> {
        match self {
            Update::Command(cmd) => Some(cmd),
            _ => None,
        }
    }
}

/// Inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Interactive controls attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    /// Rows of inline buttons
    InlineKeyboard(Vec<Vec<Button>>),
    /// Ask the client to open a reply to this message
    ForceReply,
}

/// Message to be sent by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: ChatRef,
    pub text: String,
    pub annotations: Vec<Annotation>,
    pub controls: Option<Controls>,
    pub reply_to: Option<MessageRef>,
    /// Send even when `reply_to` no longer exists
    pub allow_sending_without_reply: bool,
    /// Render the text as MarkdownV2
    pub markdown: bool,
}

impl OutboundMessage {
    pub fn new(chat_id: ChatRef, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            annotations: Vec::new(),
            controls: None,
            reply_to: None,
            allow_sending_without_reply: false,
            markdown: false,
        }
    }

    pub fn controls(mut self, controls: Controls) -> Self {
        self.controls = Some(controls);
        self
    }

    pub fn reply_to(mut self, message_id: MessageRef) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    pub fn allow_sending_without_reply(mut self) -> Self {
        self.allow_sending_without_reply = true;
        self
    }

    pub fn markdown(mut self) -> Self {
        self.markdown = true;
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Result of a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatRef,
    pub message_id: MessageRef,
}
