use rewind_core::error::Result;
use rewind_core::{LoggedCompensation, Mark};

/// Ordered, append-only storage for compensation records.
///
/// Records are appended with strictly increasing marks. The high-water mark
/// is one past the newest mark ever appended and is never lowered by a
/// discard, so a mark is never handed out twice.
pub trait CompensationStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn high_water(&self) -> Result<Mark>;

    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn append(&mut self, entry: LoggedCompensation) -> Result<()>;

    /// Records with a mark at or after `mark`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn entries_from(&self, mark: Mark) -> Result<Vec<LoggedCompensation>>;

    /// Drop every record with a mark at or after `mark`.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be persisted.
    fn discard_from(&mut self, mark: Mark) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn len(&self) -> Result<usize>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCompensationStore {
    records: Vec<LoggedCompensation>,
    high_water: Mark,
}

impl MemoryCompensationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompensationStore for MemoryCompensationStore {
    fn high_water(&self) -> Result<Mark> {
        Ok(self.high_water)
    }

    fn append(&mut self, entry: LoggedCompensation) -> Result<()> {
        self.high_water = self.high_water.max(entry.mark.next());
        self.records.push(entry);
        Ok(())
    }

    fn entries_from(&self, mark: Mark) -> Result<Vec<LoggedCompensation>> {
        let start = self.records.partition_point(|entry| entry.mark < mark);
        Ok(self.records[start..].to_vec())
    }

    fn discard_from(&mut self, mark: Mark) -> Result<()> {
        let start = self.records.partition_point(|entry| entry.mark < mark);
        self.records.truncate(start);
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}
