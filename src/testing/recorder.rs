//! Transport that records outbound calls instead of sending them

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::telegram::transport::{Transport, TransportError};
use crate::telegram::types::{ChatRef, Controls, MessageRef, OutboundMessage, SentMessage};

/// One recorded outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    SendMessage(OutboundMessage),
    EditMessageText {
        chat_id: ChatRef,
        message_id: MessageRef,
        text: String,
        controls: Option<Controls>,
    },
    EditMessageControls {
        chat_id: ChatRef,
        message_id: MessageRef,
        controls: Option<Controls>,
    },
    AcknowledgeInteraction {
        interaction_id: String,
        text: Option<String>,
    },
}

/// Records every call; sent messages get increasing ids starting at 1000
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    next_message_id: AtomicI32,
    failing: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_message_id: AtomicI32::new(1000),
            failing: AtomicBool::new(false),
        }
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call is still recorded but returns an error
    pub fn failing() -> Self {
        let transport = Self::default();
        transport.set_failing(true);
        transport
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::SendMessage(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Texts of acknowledgements, in order
    pub fn acknowledgements(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::AcknowledgeInteraction { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn control_edits(&self) -> Vec<(ChatRef, MessageRef, Option<Controls>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::EditMessageControls {
                    chat_id,
                    message_id,
                    controls,
                } => Some((chat_id, message_id, controls)),
                _ => None,
            })
            .collect()
    }

    pub fn text_edits(&self) -> Vec<(ChatRef, MessageRef, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::EditMessageText {
                    chat_id,
                    message_id,
                    text,
                    ..
                } => Some((chat_id, message_id, text)),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TransportCall>> {
        // A panicking test thread must not hide the calls from the others
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        self.lock().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Other("recording transport set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, message: OutboundMessage) -> Result<SentMessage, TransportError> {
        let chat_id = message.chat_id;
        self.record(TransportCall::SendMessage(message))?;
        Ok(SentMessage {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_message_text(
        &self,
        chat_id: ChatRef,
        message_id: MessageRef,
        text: String,
        controls: Option<Controls>,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::EditMessageText {
            chat_id,
            message_id,
            text,
            controls,
        })
    }

    async fn edit_message_controls(
        &self,
        chat_id: ChatRef,
        message_id: MessageRef,
        controls: Option<Controls>,
    ) -> Result<(), TransportError> {
        self.record(TransportCall::EditMessageControls {
            chat_id,
            message_id,
            controls,
        })
    }

    async fn acknowledge_interaction(&self, interaction_id: &str, text: Option<String>) -> Result<(), TransportError> {
        self.record(TransportCall::AcknowledgeInteraction {
            interaction_id: interaction_id.to_string(),
            text,
        })
    }
}
