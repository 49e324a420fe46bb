//! Compensation log for reversible mutations.
//!
//! State owners append a compensation record for every mutation they make.
//! Rewinding the log to a mark runs the registered compensator of every
//! record appended after that mark, newest first, and then discards them.

mod audit;
mod compensator;
mod erased;
mod error;
mod file;
mod log;
mod store;

pub use audit::{CompensationStatus, RewindAudit, RewindRecord};
pub use compensator::{Compensator, RewindMode};
pub use error::CompensationError;
pub use file::JsonFileCompensationStore;
pub use log::{CompensationLog, CompensationWriter};
pub use store::{CompensationStore, MemoryCompensationStore};
