//! Run events and reports
//!
//! Every engine outcome is published as a `DispatchEvent`; its `Display` is
//! the status line shown to the operator.

use std::fmt;
use std::time::Duration;

use contracts::ProgressRecord;
use serde::Serialize;

use crate::metrics::DispatchMetricsSnapshot;

/// Why an item was not sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Link message carries no URL
    MissingLink,
    /// Media message carries no media
    MissingMedia,
    /// Media handle stale even after refresh
    StaleReference(String),
    /// Provider refused or failed the send
    ProviderFailure(String),
}

impl SkipReason {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingLink => "missing_link",
            Self::MissingMedia => "missing_media",
            Self::StaleReference(_) => "stale_reference",
            Self::ProviderFailure(_) => "provider_failure",
        }
    }

    /// Skipped for absent content rather than a failure
    pub fn is_missing_content(&self) -> bool {
        matches!(self, Self::MissingLink | Self::MissingMedia)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLink => write!(f, "no link"),
            Self::MissingMedia => write!(f, "no media"),
            Self::StaleReference(msg) => write!(f, "stale media: {msg}"),
            Self::ProviderFailure(msg) => write!(f, "send failed: {msg}"),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed(String),
}

impl RunOutcome {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// Status event emitted while a run progresses
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Started {
        run_id: u64,
        start_index: usize,
    },
    Prepared {
        run_id: u64,
        total: usize,
        captions: usize,
    },
    NothingToSend {
        run_id: u64,
        reason: String,
    },
    Sent {
        index: usize,
        total: usize,
        caption_name: String,
    },
    Skipped {
        index: usize,
        reason: SkipReason,
    },
    RateLimited {
        index: usize,
        wait: Duration,
    },
    Refreshed {
        index: usize,
    },
    Finished {
        run_id: u64,
        outcome: RunOutcome,
        sent: u64,
        skipped: u64,
    },
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                run_id,
                start_index,
            } => write!(f, "run #{run_id} started at index {start_index}"),
            Self::Prepared {
                run_id,
                total,
                captions,
            } => write!(
                f,
                "run #{run_id}: {total} posts ready ({captions} captions)"
            ),
            Self::NothingToSend { run_id, reason } => {
                write!(f, "run #{run_id}: nothing to send ({reason})")
            }
            Self::Sent {
                index,
                total,
                caption_name,
            } => write!(f, "[{}/{total}] {caption_name} sent", index + 1),
            Self::Skipped { index, reason } => {
                write!(f, "item {} skipped: {reason}", index + 1)
            }
            Self::RateLimited { index, wait } => write!(
                f,
                "item {} rate limited, waiting {:.1}s",
                index + 1,
                wait.as_secs_f64()
            ),
            Self::Refreshed { index } => {
                write!(f, "item {} media refreshed, resending", index + 1)
            }
            Self::Finished {
                run_id,
                outcome,
                sent,
                skipped,
            } => write!(
                f,
                "run #{run_id} {outcome}: {sent} sent, {skipped} skipped"
            ),
        }
    }
}

/// Final report of a run, handed back to the controller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: u64,
    pub outcome: RunOutcome,
    pub start_index: usize,
    /// Aligned length seen by the run (0 if startup failed)
    pub total: usize,
    /// Index of the last successful send of this run
    pub last_sent: Option<usize>,
    /// Progress as persisted at the end of the run
    pub progress: ProgressRecord,
    pub metrics: DispatchMetricsSnapshot,
}

impl RunReport {
    /// Index a follow-up run should start from, if this run sent anything
    pub fn resume_index(&self) -> Option<usize> {
        self.last_sent.map(|index| index.saturating_add(1))
    }
}
