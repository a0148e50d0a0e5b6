//! Outbound message transport
//!
//! Handlers talk to Telegram only through [`Transport`], so the dispatch path
//! can be exercised in tests with a recording implementation.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ForceReply, InlineKeyboardButton, InlineKeyboardMarkup, MessageEntity, MessageEntityKind,
    MessageId, ParseMode, ReplyMarkup, ReplyParameters,
};
use thiserror::Error;

use super::types::{Annotation, Button, ChatRef, Controls, MessageRef, OutboundMessage, SentMessage};
use crate::core::utils::escape_markdown_v2;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),

    #[error("Invalid annotation url {url}: {source}")]
    InvalidUrl { url: String, source: url::ParseError },

    #[error("{0}")]
    Other(String),
}

/// The four outbound operations handlers need
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, message: OutboundMessage) -> Result<SentMessage, TransportError>;

    async fn edit_message_text(
        &self,
        chat_id: ChatRef,
        message_id: MessageRef,
        text: String,
        controls: Option<Controls>,
    ) -> Result<(), TransportError>;

    /// Replaces the inline keyboard of a message; `None` removes it
    async fn edit_message_controls(
        &self,
        chat_id: ChatRef,
        message_id: MessageRef,
        controls: Option<Controls>,
    ) -> Result<(), TransportError>;

    async fn acknowledge_interaction(&self, interaction_id: &str, text: Option<String>) -> Result<(), TransportError>;
}

/// [`Transport`] backed by the Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_with_text(&self, message: &OutboundMessage, text: String) -> Result<SentMessage, TransportError> {
        let mut req = self.bot.send_message(ChatId(message.chat_id), text);

        if !message.annotations.is_empty() {
            let entities = message
                .annotations
                .iter()
                .cloned()
                .map(text_link)
                .collect::<Result<Vec<_>, _>>()?;
            req = req.entities(entities);
        }
        if message.markdown {
            req = req.parse_mode(ParseMode::MarkdownV2);
        }
        if let Some(controls) = message.controls.clone() {
            req = req.reply_markup(reply_markup(controls));
        }
        if let Some(reply_to) = message.reply_to {
            let mut params = ReplyParameters::new(MessageId(reply_to));
            if message.allow_sending_without_reply {
                params.allow_sending_without_reply = Some(true);
            }
            req = req.reply_parameters(params);
        }

        let sent = req.await?;
        Ok(SentMessage {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }
}

fn is_markdown_parse_error(err: &teloxide::RequestError) -> bool {
    err.to_string().to_lowercase().contains("can't parse entities")
}

fn inline_keyboard(rows: Vec<Vec<Button>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.text, button.callback_data))
            .collect::<Vec<_>>()
    }))
}

fn reply_markup(controls: Controls) -> ReplyMarkup {
    match controls {
        Controls::InlineKeyboard(rows) => ReplyMarkup::InlineKeyboard(inline_keyboard(rows)),
        Controls::ForceReply => ReplyMarkup::ForceReply(ForceReply::new()),
    }
}

fn text_link(annotation: Annotation) -> Result<MessageEntity, TransportError> {
    let url = url::Url::parse(&annotation.url).map_err(|source| TransportError::InvalidUrl {
        url: annotation.url.clone(),
        source,
    })?;
    Ok(MessageEntity::new(
        MessageEntityKind::TextLink { url },
        annotation.offset,
        annotation.length,
    ))
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, message: OutboundMessage) -> Result<SentMessage, TransportError> {
        match self.send_with_text(&message, message.text.clone()).await {
            Err(TransportError::Request(e)) if message.markdown && is_markdown_parse_error(&e) => {
                log::warn!("MarkdownV2 rejected for chat {}, resending escaped: {}", message.chat_id, e);
                self.send_with_text(&message, escape_markdown_v2(&message.text)).await
            }
            result => result,
        }
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatRef,
        message_id: MessageRef,
        text: String,
        controls: Option<Controls>,
    ) -> Result<(), TransportError> {
        let mut req = self.bot.edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        if let Some(Controls::InlineKeyboard(rows)) = controls {
            req = req.reply_markup(inline_keyboard(rows));
        }
        req.await?;
        Ok(())
    }

    async fn edit_message_controls(
        &self,
        chat_id: ChatRef,
        message_id: MessageRef,
        controls: Option<Controls>,
    ) -> Result<(), TransportError> {
        let mut req = self.bot.edit_message_reply_markup(ChatId(chat_id), MessageId(message_id));
        if let Some(Controls::InlineKeyboard(rows)) = controls {
            req = req.reply_markup(inline_keyboard(rows));
        }
        req.await?;
        Ok(())
    }

    async fn acknowledge_interaction(&self, interaction_id: &str, text: Option<String>) -> Result<(), TransportError> {
        let mut req = self.bot.answer_callback_query(CallbackQueryId(interaction_id.to_string()));
        if let Some(text) = text {
            req = req.text(text);
        }
        req.await?;
        Ok(())
    }
}
