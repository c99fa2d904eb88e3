//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the forwarder.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Ordering Model
//! - Channel history is enumerated by providers newest-first
//! - Everything past `ingestion` works on oldest-first sequences
//! - `index` values are positions in the aligned (oldest-first) sequence

mod batch;
mod blueprint;
mod error;
mod message;
mod provider;

pub use batch::*;
pub use blueprint::*;
pub use error::*;
pub use message::*;
pub use provider::{LinkButton, MessagingProvider, OutgoingPost, PostMedia, StagedMedia};
