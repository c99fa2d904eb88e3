//! Sequence alignment
//!
//! Captions are counted but never paired by position: the caption cursor
//! advances independently, on successful sends only.

use contracts::{AlignedEntry, SourceMessage};
use tracing::debug;

/// Aligned view of the two channel sources
#[derive(Debug, Clone, Default)]
pub struct AlignedBatch {
    entries: Vec<AlignedEntry>,
}

impl AlignedBatch {
    /// Number of aligned entries
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// No entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&AlignedEntry> {
        self.entries.get(index)
    }

    /// Entries from `start` to the end; empty when `start >= total`
    pub fn iter_from(&self, start: usize) -> impl Iterator<Item = &AlignedEntry> {
        self.entries.iter().skip(start)
    }
}

/// Pairs the oldest-first media and link sequences
pub struct SequenceAligner;

impl SequenceAligner {
    /// Align the sources
    ///
    /// `total = min(media.len(), links.len(), caption_count)`. Entry `i` holds
    /// whatever media and text the `i`-th messages carry; absence is resolved
    /// by the engine as a skip.
    pub fn align(
        media: &[SourceMessage],
        links: &[SourceMessage],
        caption_count: usize,
    ) -> AlignedBatch {
        let total = media.len().min(links.len()).min(caption_count);

        let entries: Vec<AlignedEntry> = media
            .iter()
            .zip(links)
            .take(total)
            .enumerate()
            .map(|(index, (media_msg, link_msg))| AlignedEntry {
                index,
                media: media_msg.media.clone(),
                link_text: link_msg.text.clone(),
            })
            .collect();

        debug!(
            media = media.len(),
            links = links.len(),
            captions = caption_count,
            total = entries.len(),
            "Sources aligned"
        );

        AlignedBatch { entries }
    }
}
