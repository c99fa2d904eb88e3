//! Progress persistence
//!
//! A single JSON record `{"last_index": n, "caption_index": m}` at a fixed
//! path. Writes go to a temp file in the same directory and are renamed over
//! the record, so a crash leaves either the old or the new record. There is
//! no locking against concurrent writers.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use contracts::ProgressRecord;
use tempfile::NamedTempFile;
use tracing::{debug, instrument, warn};

use crate::error::{DispatchError, Result};

/// Progress file store
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    /// Create a store for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Progress file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, falling back to `{0, 0}` on any problem
    pub fn load(&self) -> ProgressRecord {
        match self.load_existing() {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Progress unreadable, starting from zero");
                ProgressRecord::default()
            }
        }
    }

    /// Load the record if one exists
    ///
    /// A missing file is `None`. A corrupt file (bad JSON or bad UTF-8) is
    /// logged and treated as missing. Only open/read failures are fatal.
    #[instrument(name = "progress_load", skip(self), fields(path = %self.path.display()))]
    pub fn load_existing(&self) -> Result<Option<ProgressRecord>> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DispatchError::fatal_io(&self.path, e)),
        };

        match serde_json::from_slice::<ProgressRecord>(&content) {
            Ok(record) => {
                debug!(
                    last_index = record.last_index,
                    caption_index = record.caption_index,
                    "Progress loaded"
                );
                Ok(Some(record))
            }
            Err(e) => {
                warn!(error = %e, "Corrupt progress file ignored");
                Ok(None)
            }
        }
    }

    /// Atomically replace the record
    #[instrument(
        name = "progress_save",
        skip(self),
        fields(path = %self.path.display(), last_index = record.last_index)
    )]
    pub fn save(&self, record: &ProgressRecord) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| DispatchError::fatal_io(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| DispatchError::fatal_io(dir, e))?;
        serde_json::to_writer(&mut tmp, record)?;
        tmp.flush()
            .map_err(|e| DispatchError::fatal_io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| DispatchError::fatal_io(&self.path, e.error))?;
        Ok(())
    }
}
