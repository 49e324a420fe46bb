use rewind_core::error::Result;
use rewind_core::{Action, ActionEntry};
use serde::{Deserialize, Serialize};

use crate::traits::ActionStore;

/// Applied and undone lists as they are laid out in memory and on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ActionHistory {
    pub(crate) applied: Vec<ActionEntry>,
    pub(crate) undone: Vec<Action>,
}

#[derive(Debug, Default)]
pub struct MemoryActionStore {
    history: ActionHistory,
}

impl MemoryActionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionStore for MemoryActionStore {
    fn applied_len(&self) -> Result<usize> {
        Ok(self.history.applied.len())
    }

    fn applied_at(&self, index: usize) -> Result<Option<ActionEntry>> {
        Ok(self.history.applied.get(index).cloned())
    }

    fn push_applied(&mut self, entry: ActionEntry) -> Result<()> {
        self.history.applied.push(entry);
        Ok(())
    }

    fn truncate_applied(&mut self, len: usize) -> Result<()> {
        self.history.applied.truncate(len);
        Ok(())
    }

    fn undone_len(&self) -> Result<usize> {
        Ok(self.history.undone.len())
    }

    fn undone_at(&self, index: usize) -> Result<Option<Action>> {
        Ok(self.history.undone.get(index).cloned())
    }

    fn push_undone(&mut self, action: Action) -> Result<()> {
        self.history.undone.push(action);
        Ok(())
    }

    fn truncate_undone(&mut self, len: usize) -> Result<()> {
        self.history.undone.truncate(len);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rewind_core::Mark;

    use super::*;

    #[test]
    fn applied_and_undone_are_independent_lists() -> anyhow::Result<()> {
        let mut store = MemoryActionStore::new();
        store.push_applied(ActionEntry::new(Mark::ZERO, Action::new("A", "first")))?;
        store.push_applied(ActionEntry::new(Mark::new(1), Action::new("A", "second")))?;
        store.push_undone(Action::new("B", "undone"))?;

        assert_eq!(store.applied_len()?, 2);
        assert_eq!(store.undone_len()?, 1);
        assert_eq!(
            store.applied_at(1)?.map(|entry| entry.action.name),
            Some("second".to_string())
        );
        assert!(store.applied_at(2)?.is_none());
        Ok(())
    }

    #[test]
    fn truncate_trims_from_the_end() -> anyhow::Result<()> {
        let mut store = MemoryActionStore::new();
        for name in ["a", "b", "c"] {
            store.push_undone(Action::new("A", name))?;
        }

        store.truncate_undone(1)?;

        assert_eq!(store.undone_len()?, 1);
        assert_eq!(store.undone_at(0)?, Some(Action::new("A", "a")));
        Ok(())
    }
}
