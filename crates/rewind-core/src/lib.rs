//! Core types shared by the rewind crates.
//!
//! Actions are plain serializable data. Compensation records and marks
//! describe how to reverse the mutations an action performed.

mod action;
pub mod error;
mod mark;
pub mod persist;
mod record;

pub use action::{Action, ActionEntry, ActionKind, COMPOSITE_TYPE};
pub use error::{BoxError, StoreError};
pub use mark::Mark;
pub use record::{CompensationRecord, LoggedCompensation};
