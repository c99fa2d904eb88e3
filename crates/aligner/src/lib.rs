//! # Aligner
//!
//! Positional pairing of the media and link sources.
//!
//! Responsibilities:
//! - Pair `media[i]` with `link[i]` over `min(media, links, captions)` entries
//! - Locate a start offset by link substring
//!
//! ## Usage Example
//!
//! ```ignore
//! use aligner::{LinkLocator, SequenceAligner};
//!
//! let batch = SequenceAligner::align(&channels.media, &channels.links, captions.len());
//! for entry in batch.iter_from(start_index) {
//!     // Build and dispatch the post
//! }
//!
//! let offset = LinkLocator::locate(&channels.links, "foo123");
//! ```

mod aligner;
mod locator;

pub use aligner::{AlignedBatch, SequenceAligner};
pub use contracts::AlignedEntry;
pub use locator::LinkLocator;
