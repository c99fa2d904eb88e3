//! Replies to control requests

use std::fmt;
use std::time::Duration;

use contracts::ProgressRecord;
use dispatcher::RunOutcome;

/// Read-only view of the controller
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub running: bool,
    pub interval: Duration,
    /// Index the next `on` starts from
    pub start_index: usize,
    pub caption_index: usize,
    /// Run still executing or unwinding
    pub active_run: Option<u64>,
    /// Latest persisted progress
    pub progress: ProgressRecord,
    pub last_outcome: Option<RunOutcome>,
    pub media_channel: String,
    pub links_channel: String,
    pub destination: String,
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (self.running, self.active_run) {
            (true, Some(run_id)) => format!("running (run #{run_id})"),
            (false, Some(run_id)) => format!("stopping (run #{run_id})"),
            _ => "idle".to_string(),
        };
        writeln!(f, "status: {state}")?;
        writeln!(f, "interval: {}s", self.interval.as_secs_f64())?;
        writeln!(f, "next start index: {}", self.start_index)?;
        writeln!(f, "caption index: {}", self.caption_index)?;
        writeln!(f, "last sent index: {}", self.progress.last_index)?;
        if let Some(outcome) = &self.last_outcome {
            writeln!(f, "last run: {outcome}")?;
        }
        writeln!(f, "media: {}", self.media_channel)?;
        writeln!(f, "links: {}", self.links_channel)?;
        write!(f, "destination: {}", self.destination)
    }
}

/// Reply to a control request
#[derive(Debug, Clone, PartialEq)]
pub enum ControlReply {
    Started { run_id: u64, start_index: usize },
    AlreadyRunning,
    Stopped,
    IntervalSet(Duration),
    IntervalRejected(String),
    NotFound(String),
    LookupFailed(String),
    Status(Box<StatusSnapshot>),
    Usage(String),
    ShuttingDown,
}

impl ControlReply {
    /// Whether the request changed controller state
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            Self::Started { .. } | Self::Stopped | Self::IntervalSet(_) | Self::Status(_)
        )
    }
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                run_id,
                start_index,
            } => write!(f, "started run #{run_id} from index {start_index}"),
            Self::AlreadyRunning => write!(f, "already running"),
            Self::Stopped => write!(f, "stopped"),
            Self::IntervalSet(interval) => {
                write!(f, "interval set to {}s", interval.as_secs_f64())
            }
            Self::IntervalRejected(reason) => write!(f, "interval rejected: {reason}"),
            Self::NotFound(needle) => write!(f, "no link containing '{needle}' found"),
            Self::LookupFailed(reason) => write!(f, "link lookup failed: {reason}"),
            Self::Status(status) => write!(f, "{status}"),
            Self::Usage(text) => write!(f, "{text}"),
            Self::ShuttingDown => write!(f, "shutting down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_rendering() {
        let status = StatusSnapshot {
            running: false,
            interval: Duration::from_secs_f64(2.5),
            start_index: 4,
            caption_index: 1,
            active_run: Some(3),
            progress: ProgressRecord::new(3, 1),
            last_outcome: None,
            media_channel: "m".to_string(),
            links_channel: "l".to_string(),
            destination: "d".to_string(),
        };
        let text = status.to_string();
        assert!(text.starts_with("status: stopping (run #3)"));
        assert!(text.contains("interval: 2.5s"));
        assert!(text.ends_with("destination: d"));
    }

    #[test]
    fn test_reply_lines() {
        assert_eq!(
            ControlReply::Started {
                run_id: 1,
                start_index: 0
            }
            .to_string(),
            "started run #1 from index 0"
        );
        assert_eq!(
            ControlReply::NotFound("foo123".to_string()).to_string(),
            "no link containing 'foo123' found"
        );
        assert!(!ControlReply::AlreadyRunning.is_accepted());
    }
}
