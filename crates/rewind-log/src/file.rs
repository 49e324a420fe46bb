use std::path::{Path, PathBuf};

use rewind_core::error::Result;
use rewind_core::persist::{load_json_file, save_json_file};
use rewind_core::{LoggedCompensation, Mark, StoreError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::CompensationStore;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompensationDocument {
    high_water: Mark,
    records: Vec<LoggedCompensation>,
}

/// Compensation store persisted as a single JSON document.
///
/// The whole document is rewritten after every mutation.
#[derive(Debug)]
pub struct JsonFileCompensationStore {
    path: PathBuf,
    pretty: bool,
    document: CompensationDocument,
}

impl JsonFileCompensationStore {
    /// Open the store at `path`, starting empty if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if its records are out of order.
    pub fn open(path: impl Into<PathBuf>, pretty: bool) -> Result<Self> {
        let path = path.into();
        let document: CompensationDocument = load_json_file(&path)?.unwrap_or_default();

        if !document.records.is_sorted_by(|a, b| a.mark < b.mark) {
            return Err(StoreError::Corrupt(format!(
                "compensation records in '{}' are not in mark order",
                path.display()
            )));
        }
        if let Some(last) = document.records.last() {
            if last.mark >= document.high_water {
                return Err(StoreError::Corrupt(format!(
                    "high-water mark {} in '{}' is behind record {}",
                    document.high_water,
                    path.display(),
                    last.mark
                )));
            }
        }

        debug!(
            path = %path.display(),
            records = document.records.len(),
            high_water = %document.high_water,
            "opened compensation store"
        );
        Ok(Self {
            path,
            pretty,
            document,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        save_json_file(&self.path, &self.document, self.pretty)
    }
}

impl CompensationStore for JsonFileCompensationStore {
    fn high_water(&self) -> Result<Mark> {
        Ok(self.document.high_water)
    }

    fn append(&mut self, entry: LoggedCompensation) -> Result<()> {
        let previous_high_water = self.document.high_water;
        self.document.high_water = previous_high_water.max(entry.mark.next());
        self.document.records.push(entry);

        if let Err(error) = self.save() {
            self.document.records.pop();
            self.document.high_water = previous_high_water;
            return Err(error);
        }
        Ok(())
    }

    fn entries_from(&self, mark: Mark) -> Result<Vec<LoggedCompensation>> {
        let start = self
            .document
            .records
            .partition_point(|entry| entry.mark < mark);
        Ok(self.document.records[start..].to_vec())
    }

    fn discard_from(&mut self, mark: Mark) -> Result<()> {
        let start = self
            .document
            .records
            .partition_point(|entry| entry.mark < mark);
        if start == self.document.records.len() {
            return Ok(());
        }
        let removed = self.document.records.split_off(start);

        if let Err(error) = self.save() {
            self.document.records.extend(removed);
            return Err(error);
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.document.records.len())
    }
}
