//! Caption list loader
//!
//! Plain text, one caption per line. Lines are trimmed and blank lines
//! dropped. A missing file is an empty list; any other read failure is an
//! error, since the run cannot assign captions without it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::{IngestionError, Result};

/// Caption list loader bound to a file path
#[derive(Debug, Clone)]
pub struct CaptionLoader {
    path: PathBuf,
}

impl CaptionLoader {
    /// Create a loader for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Caption file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the caption list
    #[instrument(name = "caption_load", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let captions = parse_captions(&content);
                debug!(count = captions.len(), "Captions loaded");
                Ok(captions)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Caption file not found, treating as empty");
                Ok(Vec::new())
            }
            Err(source) => Err(IngestionError::CaptionRead {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Split caption file content into captions
pub fn parse_captions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
