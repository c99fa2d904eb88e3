//! Ingestion error types

use std::path::PathBuf;

use contracts::ProviderError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Caption file exists but cannot be read
    #[error("failed to read caption file {}: {source}", path.display())]
    CaptionRead {
        /// Caption file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Channel history could not be enumerated
    #[error("failed to enumerate channel '{channel}': {source}")]
    ChannelHistory {
        /// Channel name
        channel: String,
        /// Classified provider failure
        #[source]
        source: ProviderError,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
