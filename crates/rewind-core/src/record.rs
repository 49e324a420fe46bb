use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mark::Mark;

/// Instruction to reverse one mutation: which compensator to run and the
/// payload it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationRecord {
    pub compensator_name: String,
    pub payload: Value,
}

impl CompensationRecord {
    #[must_use]
    pub fn new(compensator_name: impl Into<String>, payload: Value) -> Self {
        Self {
            compensator_name: compensator_name.into(),
            payload,
        }
    }
}

/// A compensation record as held by a store, tagged with its mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedCompensation {
    pub mark: Mark,
    #[serde(flatten)]
    pub record: CompensationRecord,
}

impl LoggedCompensation {
    #[must_use]
    pub fn new(mark: Mark, record: CompensationRecord) -> Self {
        Self { mark, record }
    }

    #[must_use]
    pub fn compensator_name(&self) -> &str {
        &self.record.compensator_name
    }
}
