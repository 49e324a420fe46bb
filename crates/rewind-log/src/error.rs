use rewind_core::{BoxError, Mark, StoreError};
use thiserror::Error;

/// Failure while rewinding the compensation log.
///
/// Any of these leaves the log partially rewound: records newer than the
/// failing one were compensated and discarded, the failing record and
/// everything older remain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompensationError {
    #[error("no compensator registered under '{name}' (record {mark})")]
    UnknownCompensator { name: String, mark: Mark },

    #[error("payload for compensator '{name}' (record {mark}) is malformed")]
    MalformedPayload {
        name: String,
        mark: Mark,
        #[source]
        source: serde_json::Error,
    },

    #[error("compensation '{description}' failed for record {mark}")]
    Failed {
        /// Name the compensator was registered under.
        name: String,
        mark: Mark,
        /// Description of what the compensation was trying to do.
        description: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CompensationError {
    /// Mark of the record that could not be compensated, if any.
    #[must_use]
    pub fn mark(&self) -> Option<Mark> {
        match self {
            Self::UnknownCompensator { mark, .. }
            | Self::MalformedPayload { mark, .. }
            | Self::Failed { mark, .. } => Some(*mark),
            Self::Store(_) => None,
        }
    }
}
