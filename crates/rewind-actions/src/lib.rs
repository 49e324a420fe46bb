//! Atomic actions over decoupled state owners.
//!
//! A [`Coordinator`] dispatches each [`Action`] to the [`Applier`] registered
//! for its type. Appliers mutate their own state and record how to reverse
//! each mutation in the compensation log. A failed action is rolled back in
//! full; applied actions can be undone and redone in batches.

mod applier;
mod callbacks;
mod composite;
mod config;
mod coordinator;
mod error;
mod notify;
pub mod providers;
pub mod traits;

#[cfg(test)]
mod mocks;

pub use applier::{ApplyMode, ApplyScope, Applier, decode_param};
pub use callbacks::ActionCallbacks;
pub use composite::CompositeApplier;
pub use config::StorageConfig;
pub use coordinator::{Coordinator, FileCoordinator, MemoryCoordinator};
pub use error::{ActionError, ConfigError, Result};
pub use notify::{Notification, SubscriptionId};
pub use rewind_core::{Action, ActionEntry, ActionKind, BoxError, COMPOSITE_TYPE, Mark, StoreError};
pub use rewind_log::{CompensationError, CompensationLog, Compensator, RewindMode};
