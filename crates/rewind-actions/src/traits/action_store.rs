use rewind_core::error::Result;
use rewind_core::{Action, ActionEntry};

/// Storage for the applied and undone action lists.
///
/// Both lists are ordered oldest first. Entries are only ever appended to
/// or trimmed from the end.
pub trait ActionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn applied_len(&self) -> Result<usize>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn applied_at(&self, index: usize) -> Result<Option<ActionEntry>>;

    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    fn push_applied(&mut self, entry: ActionEntry) -> Result<()>;

    /// Keep only the first `len` applied entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    fn truncate_applied(&mut self, len: usize) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn undone_len(&self) -> Result<usize>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn undone_at(&self, index: usize) -> Result<Option<Action>>;

    /// # Errors
    ///
    /// Returns an error if the action cannot be persisted.
    fn push_undone(&mut self, action: Action) -> Result<()>;

    /// Keep only the first `len` undone actions.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    fn truncate_undone(&mut self, len: usize) -> Result<()>;
}
