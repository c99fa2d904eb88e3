//! Aligned batch data structures
//!
//! `AlignedEntry` is what the aligner emits, `BatchItem` is what gets sent,
//! `ProgressRecord` is what survives restarts.

use serde::{Deserialize, Serialize};

use crate::MediaRef;

/// Raw positional pairing of the media and link sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedEntry {
    /// Common position across the aligned sources
    pub index: usize,

    /// Media attached to `media[index]`, if any
    pub media: Option<MediaRef>,

    /// Text of `link[index]`, if any
    pub link_text: Option<String>,
}

/// Composite post ready for dispatch
///
/// Built once link and media are confirmed and the caption cursor applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Position in the aligned sequence
    pub index: usize,

    /// Media to forward
    pub media: MediaRef,

    /// Extracted link
    pub link: String,

    /// Caption line selected by the caption cursor
    pub caption_name: String,
}

/// Persisted resume point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Index of the most recently sent item
    pub last_index: usize,

    /// Caption cursor to use for the next send
    pub caption_index: usize,
}

impl ProgressRecord {
    /// Create a record
    pub fn new(last_index: usize, caption_index: usize) -> Self {
        Self {
            last_index,
            caption_index,
        }
    }

    /// First index that has not been sent yet
    pub fn next_index(&self) -> usize {
        self.last_index.saturating_add(1)
    }
}
