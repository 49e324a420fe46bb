use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by domain code plugged into the engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a backing store for actions or compensation records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write store file '{path}'")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse store file '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store file '{path}'")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store is corrupt: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
