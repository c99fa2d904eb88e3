//! Dispatch error types
//!
//! Only startup can fail a run. Per-item provider failures are handled
//! inside the delivery loop and never surface here.

use std::path::PathBuf;

use ingestion::IngestionError;
use thiserror::Error;

/// Dispatch-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Caption or progress file exists but cannot be read or written
    #[error("fatal io on {}: {source}", path.display())]
    FatalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Progress record could not be encoded
    #[error("progress encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Source channel enumeration failed
    #[error(transparent)]
    Source(IngestionError),
}

impl DispatchError {
    /// Create a fatal IO error
    pub fn fatal_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FatalIo {
            path: path.into(),
            source,
        }
    }
}

impl From<IngestionError> for DispatchError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::CaptionRead { path, source } => Self::FatalIo { path, source },
            other => Self::Source(other),
        }
    }
}

/// Dispatch Result type alias
pub type Result<T> = std::result::Result<T, DispatchError>;
