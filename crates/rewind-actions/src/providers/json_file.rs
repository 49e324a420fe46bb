use std::path::{Path, PathBuf};

use rewind_core::error::Result;
use rewind_core::persist::{load_json_file, save_json_file};
use rewind_core::{Action, ActionEntry, StoreError};
use tracing::debug;

use super::memory::ActionHistory;
use crate::traits::ActionStore;

/// Action store persisted as a single JSON document
/// `{ "applied": [{ "mark", "action" }], "undone": [action] }`.
///
/// The document is rewritten after every mutation. A failed write leaves
/// the in-memory lists as they were before the call.
#[derive(Debug)]
pub struct JsonFileActionStore {
    path: PathBuf,
    pretty: bool,
    history: ActionHistory,
}

impl JsonFileActionStore {
    /// Open the store at `path`, starting empty if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the applied entries are not in mark order.
    pub fn open(path: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let path = path.into();
        let history: ActionHistory = load_json_file(&path)?.unwrap_or_default();

        if !history.applied.is_sorted_by(|a, b| a.mark <= b.mark) {
            return Err(StoreError::Corrupt(format!(
                "applied actions in '{}' are not in mark order",
                path.display()
            )));
        }

        debug!(
            path = %path.display(),
            applied = history.applied.len(),
            undone = history.undone.len(),
            "opened action store"
        );
        Ok(Self {
            path,
            pretty,
            history,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, previous: ActionHistory) -> Result<()> {
        if let Err(error) = save_json_file(&self.path, &self.history, self.pretty) {
            self.history = previous;
            return Err(error);
        }
        Ok(())
    }
}

impl ActionStore for JsonFileActionStore {
    fn applied_len(&self) -> Result<usize> {
        Ok(self.history.applied.len())
    }

    fn applied_at(&self, index: usize) -> Result<Option<ActionEntry>> {
        Ok(self.history.applied.get(index).cloned())
    }

    fn push_applied(&mut self, entry: ActionEntry) -> Result<()> {
        let previous = self.history.clone();
        self.history.applied.push(entry);
        self.commit(previous)
    }

    fn truncate_applied(&mut self, len: usize) -> Result<()> {
        if len >= self.history.applied.len() {
            return Ok(());
        }
        let previous = self.history.clone();
        self.history.applied.truncate(len);
        self.commit(previous)
    }

    fn undone_len(&self) -> Result<usize> {
        Ok(self.history.undone.len())
    }

    fn undone_at(&self, index: usize) -> Result<Option<Action>> {
        Ok(self.history.undone.get(index).cloned())
    }

    fn push_undone(&mut self, action: Action) -> Result<()> {
        let previous = self.history.clone();
        self.history.undone.push(action);
        self.commit(previous)
    }

    fn truncate_undone(&mut self, len: usize) -> Result<()> {
        if len >= self.history.undone.len() {
            return Ok(());
        }
        let previous = self.history.clone();
        self.history.undone.truncate(len);
        self.commit(previous)
    }
}

#[cfg(test)]
mod tests {
    use rewind_core::Mark;
    use serde_json::json;

    use super::*;

    #[test]
    fn lists_survive_reopen() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("actions.json");

        {
            let mut store = JsonFileActionStore::open(&path, true)?;
            store.push_applied(ActionEntry::new(
                Mark::new(0),
                Action::new("A", "").with_param("value", 1),
            ))?;
            store.push_undone(Action::new("B", "").with_param("value", 10))?;
        }

        let reopened = JsonFileActionStore::open(&path, true)?;
        assert_eq!(reopened.applied_len()?, 1);
        assert_eq!(
            reopened.undone_at(0)?,
            Some(Action::new("B", "").with_param("value", 10))
        );
        Ok(())
    }

    #[test]
    fn document_layout_is_plain_json() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("actions.json");
        let mut store = JsonFileActionStore::open(&path, false)?;

        store.push_applied(ActionEntry::new(
            Mark::new(4),
            Action::new("A", "set").with_param("value", 2),
        ))?;

        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(
            written,
            json!({
                "applied": [{ "mark": 4, "action": { "type": "A", "name": "set", "value": 2 } }],
                "undone": []
            })
        );
        Ok(())
    }

    #[test]
    fn truncating_beyond_length_does_not_write() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("actions.json");
        let mut store = JsonFileActionStore::open(&path, false)?;

        store.truncate_applied(3)?;

        assert!(!path.exists());
        Ok(())
    }
}
