//! Handler dependencies shared by every feature

use std::sync::Arc;

use crate::storage::KeyValueStore;
use crate::telegram::multiplexer::{Dispatcher, HandlerRegistry};
use crate::telegram::transport::Transport;

/// Dependencies required by handlers
///
/// Cloned into every handler invocation, so everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct HandlerDeps {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn KeyValueStore>,
}

impl HandlerDeps {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { transport, store }
    }
}

pub type BotRegistry = HandlerRegistry<HandlerDeps>;
pub type BotDispatcher = Dispatcher<HandlerDeps>;
