use std::path::PathBuf;

use rewind_core::{Action, BoxError, StoreError};
use rewind_log::CompensationError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActionError {
    #[error("no applier registered for action type '{0}'")]
    UnknownActionType(String),

    #[error("composite action '{name}' has no sub-actions")]
    MissingSubActions { name: String },

    #[error("action '{name}' of type '{kind}' is not a composite")]
    NotComposite { name: String, kind: String },

    #[error("action '{action}' rejected: {reason}")]
    Rejected { action: String, reason: String },

    #[error("invalid parameter '{param}' for action '{action}'")]
    InvalidParam {
        action: String,
        param: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("compensation '{compensator}' recorded while validating")]
    RecordDuringValidation { compensator: String },

    #[error("failed to encode compensation payload for '{compensator}'")]
    PayloadEncode {
        compensator: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("action '{action}' failed and rolling it back also failed: {compensation}")]
    RollbackFailed {
        action: String,
        /// The error that made the action fail.
        #[source]
        cause: Box<ActionError>,
        /// The error that stopped the rollback.
        compensation: CompensationError,
    },

    #[error("domain error")]
    Domain(#[source] BoxError),

    #[error(transparent)]
    Compensation(#[from] CompensationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ActionError {
    #[must_use]
    pub fn rejected(action: &Action, reason: impl Into<String>) -> Self {
        Self::Rejected {
            action: action.display_name().to_string(),
            reason: reason.into(),
        }
    }

    pub fn domain(error: impl Into<BoxError>) -> Self {
        Self::Domain(error.into())
    }

    /// Whether the engine's invariants may no longer hold after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. } | Self::Compensation(_))
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid storage config: {0}")]
    Invalid(String),
}
