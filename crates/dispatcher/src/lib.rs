//! # Dispatcher
//!
//! Resumable batch forwarding.
//!
//! Responsibilities:
//! - Persist progress atomically after every successful send
//! - Walk the aligned sources and send one post per entry
//! - Pace sends, back off on rate limits, refresh stale media
//! - Report every outcome as a `DispatchEvent`

pub mod caption;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod progress;

pub use engine::{DispatchEngine, DispatchSettings, RunContext};
pub use error::{DispatchError, Result};
pub use event::{DispatchEvent, RunOutcome, RunReport, SkipReason};
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use progress::ProgressStore;
