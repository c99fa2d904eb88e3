//! Control error types

use dispatcher::DispatchError;
use thiserror::Error;

/// Control errors
///
/// Rejected commands are replies, not errors; these cover the control loop
/// itself.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Persisted progress could not be read at startup
    #[error("cannot seed controller: {0}")]
    Startup(#[from] DispatchError),

    /// The control loop has exited
    #[error("control loop is not running")]
    Closed,
}

/// Control Result type alias
pub type Result<T> = std::result::Result<T, ControlError>;
