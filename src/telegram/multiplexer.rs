//! Multiple handlers per update kind
//!
//! [`Dispatcher`] accepts exactly one handler per [`UpdateKind`].
//! [`HandlerRegistry`] sits in front of it: features register as many
//! handlers as they like during bootstrap, and [`HandlerRegistry::install`]
//! then attaches one fan-out handler per kind that runs the registered
//! handlers in registration order.
//!
//! Bootstrap has two phases:
//!
//! 1. every feature calls `mount(&mut registry)`;
//! 2. `registry.install(&mut dispatcher)` attaches the kinds in
//!    [`UpdateKind::ATTACH_ORDER`], `Message` last.
//!
//! The dispatcher is a `dptree` tree with one branch per attached kind,
//! and dptree runs the first branch whose filter accepts the update. A
//! command is also a message, so attaching `Message` last is what keeps
//! generic message handlers from swallowing commands, whatever order the
//! features were mounted in.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use teloxide::dptree;
use thiserror::Error;

use super::types::{Update, UpdateKind};

/// Future returned by a handler
pub type HandlerFuture = BoxFuture<'static, ()>;

/// Type-erased update handler
///
/// Handlers own their error handling; nothing they do is reported back to
/// the dispatcher.
pub type Handler<C> = Arc<dyn Fn(C, Arc<Update>) -> HandlerFuture + Send + Sync>;

/// Handler tree; a branch ends with the kind that handled the update
type UpdateTree = dptree::Handler<'static, UpdateKind>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("a handler is already attached for {0}")]
    AlreadyAttached(UpdateKind),
}

/// Single-handler-per-kind update dispatcher
pub struct Dispatcher<C> {
    context: C,
    kinds: Vec<UpdateKind>,
    tree: UpdateTree,
}

impl<C> Dispatcher<C>
where
    C: Clone + Send + Sync + 'static,
{
    /// Creates a dispatcher that passes a clone of `context` to every handler call
    pub fn new(context: C) -> Self {
        Self {
            context,
            kinds: Vec::new(),
            tree: dptree::entry(),
        }
    }

    /// Attaches the handler for `kind` as the next branch; a kind can only be attached once
    pub fn attach(&mut self, kind: UpdateKind, handler: Handler<C>) -> Result<(), DispatchError> {
        if self.kinds.contains(&kind) {
            return Err(DispatchError::AlreadyAttached(kind));
        }
        log::debug!("Attaching {} handler", kind);

        let branch = dptree::filter(move |update: Arc<Update>| kind.claims(&update)).endpoint(
            move |context: C, update: Arc<Update>| {
                let handler = Arc::clone(&handler);
                async move {
                    handler(context, update).await;
                    kind
                }
            },
        );
        self.tree = self.tree.clone().branch(branch);
        self.kinds.push(kind);
        Ok(())
    }

    /// Kinds in the order they were attached
    pub fn attached_kinds(&self) -> Vec<UpdateKind> {
        self.kinds.clone()
    }

    /// Delivers `update` to the first attached kind that claims it
    ///
    /// Returns the kind that handled it, or `None` when nothing is attached
    /// for updates of this shape.
    pub async fn dispatch(&self, update: Update) -> Option<UpdateKind> {
        match self
            .tree
            .dispatch(dptree::deps![self.context.clone(), Arc::new(update)])
            .await
        {
            ControlFlow::Break(kind) => Some(kind),
            ControlFlow::Continue(_) => None,
        }
    }
}

/// Ordered handler lists, filled during bootstrap
pub struct HandlerRegistry<C> {
    handlers: BTreeMap<UpdateKind, Vec<Handler<C>>>,
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<C> HandlerRegistry<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the list for `kind`
    pub fn on<F, Fut>(&mut self, kind: UpdateKind, handler: F) -> &mut Self
    where
        F: Fn(C, Arc<Update>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler<C> = Arc::new(move |ctx: C, update: Arc<Update>| handler(ctx, update).boxed());
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: UpdateKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Attaches one fan-out handler per registered kind, `Message` last
    ///
    /// Consumes the registry: the lists are frozen from here on.
    pub fn install(mut self, dispatcher: &mut Dispatcher<C>) -> Result<(), DispatchError> {
        for kind in UpdateKind::ATTACH_ORDER {
            if let Some(list) = self.handlers.remove(&kind) {
                log::info!("Registered {} handler(s) for {}", list.len(), kind);
                dispatcher.attach(kind, fan_out(kind, list.into()))?;
            }
        }
        Ok(())
    }
}

/// Runs every handler of `list` in order; a panicking handler does not stop the rest
fn fan_out<C>(kind: UpdateKind, list: Arc<[Handler<C>]>) -> Handler<C>
where
    C: Clone + Send + Sync + 'static,
{
    Arc::new(move |ctx: C, update: Arc<Update>| {
        let list = Arc::clone(&list);
        async move {
            for (index, handler) in list.iter().enumerate() {
                let call = AssertUnwindSafe(async { handler(ctx.clone(), Arc::clone(&update)).await });
                if let Err(panic) = call.catch_unwind().await {
                    log::error!("Handler #{} for {} panicked: {}", index, kind, panic_message(&*panic));
                }
            }
        }
        .boxed()
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
