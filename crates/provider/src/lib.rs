//! # Provider
//!
//! Messaging provider clients.
//!
//! Responsibilities:
//! - Implement `MessagingProvider` for the supported provider kinds
//! - Classify every failure into a `ProviderError` at the edge
//! - Build the configured provider from `ProviderConfig`
//!
//! ## Provider Kinds
//!
//! - `mock`: in-memory channels with scripted failures (tests, smoke runs)
//! - `replay`: channel exports on disk, delivered posts appended to an outbox

pub mod any;
pub mod error;
pub mod mock;
pub mod replay;

pub use any::AnyProvider;
pub use contracts::{MessagingProvider, ProviderError};
pub use error::{ProviderBuildError, Result};
pub use mock::{MockConfig, MockProvider, SentPost};
pub use replay::{ReplayConfig, ReplayProvider};
