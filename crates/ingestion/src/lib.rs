//! # Ingestion
//!
//! Source loading for the forwarder.
//!
//! Responsibilities:
//! - Load the caption list from disk
//! - Enumerate the media and link channels, oldest first
//! - Extract the first link of a link-source message

mod captions;
mod channel;
mod error;
mod link;

pub use captions::{parse_captions, CaptionLoader};
pub use channel::{read_channel, SourceChannels};
pub use error::{IngestionError, Result};
pub use link::extract_link;
