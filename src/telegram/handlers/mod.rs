//! Feature handlers
//!
//! Every feature module exposes a `mount` function that registers its
//! handlers; the commands they answer to are variants of
//! [`crate::telegram::bot::Command`]. [`build_dispatcher`] runs both
//! bootstrap phases, so integration tests use the same handler set as
//! production code.

pub mod counter;
pub mod data;
pub mod rock_paper_scissors;
pub mod start;
mod types;

pub use types::{BotDispatcher, BotRegistry, HandlerDeps};

use crate::telegram::multiplexer::DispatchError;

const FEATURES: &[fn(&mut BotRegistry)] = &[start::mount, counter::mount, rock_paper_scissors::mount, data::mount];

/// Registers the handlers of every feature
pub fn mount_all(registry: &mut BotRegistry) {
    for mount in FEATURES {
        mount(registry);
    }
}

/// Mounts every feature and installs the result into a fresh dispatcher
pub fn build_dispatcher(deps: HandlerDeps) -> Result<BotDispatcher, DispatchError> {
    let mut registry = BotRegistry::new();
    mount_all(&mut registry);

    let mut dispatcher = BotDispatcher::new(deps);
    registry.install(&mut dispatcher)?;
    Ok(dispatcher)
}
