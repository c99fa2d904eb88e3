//! # Control
//!
//! Runtime control of the forwarder.
//!
//! Responsibilities:
//! - Own the control state (running flag, interval, start index, active run)
//! - Guarantee at most one run at a time
//! - Parse text commands and render replies
//!
//! ## Usage Example
//!
//! ```ignore
//! use control::{Controller, ControllerSettings};
//!
//! let controller = Controller::spawn(engine, ControllerSettings::from_blueprint(&bp), events_tx)?;
//! let handle = controller.handle();
//!
//! println!("{}", handle.execute("/on").await?);
//! println!("{}", handle.execute("setting 60").await?);
//!
//! controller.shutdown().await;
//! ```

mod command;
mod controller;
mod error;
mod handle;
mod reply;

pub use command::{Command, CommandError, StartTarget, USAGE};
pub use controller::{Controller, ControllerSettings};
pub use error::{ControlError, Result};
pub use handle::ControlHandle;
pub use reply::{ControlReply, StatusSnapshot};
