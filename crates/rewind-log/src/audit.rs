use std::time::Instant;

use rewind_core::{LoggedCompensation, Mark};

use crate::compensator::RewindMode;

/// Outcome of one record during a rewind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompensationStatus {
    /// Compensator ran and the record was discarded.
    Compensated,
    /// Compensator failed, was missing, or could not decode the payload.
    Failed,
    /// Not reached because a newer record failed.
    Skipped,
}

/// Record of one compensation record's handling during a rewind.
#[derive(Debug)]
pub struct RewindRecord {
    pub mark: Mark,
    pub compensator: String,
    pub status: CompensationStatus,
    /// Description of the compensation, when a compensator was found.
    pub description: Option<String>,
    pub completed_at: Instant,
}

/// Audit of a single rewind, newest record first.
#[derive(Debug)]
pub struct RewindAudit {
    target: Mark,
    mode: RewindMode,
    records: Vec<RewindRecord>,
}

impl RewindAudit {
    #[must_use]
    pub fn new(target: Mark, mode: RewindMode) -> Self {
        Self {
            target,
            mode,
            records: Vec::new(),
        }
    }

    pub(crate) fn record_compensated(&mut self, entry: &LoggedCompensation, description: String) {
        self.push(entry, CompensationStatus::Compensated, Some(description));
    }

    pub(crate) fn record_failure(
        &mut self,
        entry: &LoggedCompensation,
        description: Option<String>,
    ) {
        self.push(entry, CompensationStatus::Failed, description);
    }

    pub(crate) fn record_skipped(&mut self, entry: &LoggedCompensation) {
        self.push(entry, CompensationStatus::Skipped, None);
    }

    fn push(
        &mut self,
        entry: &LoggedCompensation,
        status: CompensationStatus,
        description: Option<String>,
    ) {
        self.records.push(RewindRecord {
            mark: entry.mark,
            compensator: entry.compensator_name().to_string(),
            status,
            description,
            completed_at: Instant::now(),
        });
    }

    #[must_use]
    pub fn target(&self) -> Mark {
        self.target
    }

    #[must_use]
    pub fn mode(&self) -> RewindMode {
        self.mode
    }

    #[must_use]
    pub fn records(&self) -> &[RewindRecord] {
        &self.records
    }

    /// Whether every visited record was compensated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.records
            .iter()
            .all(|record| record.status == CompensationStatus::Compensated)
    }

    /// Get a summary of the rewind for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for record in &self.records {
            let status = match record.status {
                CompensationStatus::Compensated => "↩",
                CompensationStatus::Failed => "⚠",
                CompensationStatus::Skipped => "·",
            };
            lines.push(format!("{status} {} {}", record.mark, record.compensator));
        }
        lines.join("\n")
    }
}
