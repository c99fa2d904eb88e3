//! ControlHandle - cloneable entry point to the control loop

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::command::{Command, StartTarget, USAGE};
use crate::controller::ControlMessage;
use crate::error::{ControlError, Result};
use crate::reply::{ControlReply, StatusSnapshot};

/// Handle to a running control loop
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl ControlHandle {
    pub(crate) fn new(tx: mpsc::Sender<ControlMessage>) -> Self {
        Self { tx }
    }

    pub(crate) async fn send(&self, message: ControlMessage) -> Result<()> {
        self.tx.send(message).await.map_err(|_| ControlError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControlMessage,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| ControlError::Closed)
    }

    /// Start a run from `from_index`, or from the tracked start index
    pub async fn start(&self, from_index: Option<usize>) -> Result<ControlReply> {
        self.request(|reply| ControlMessage::Start { from_index, reply })
            .await
    }

    /// Stop the active run, if any
    pub async fn stop(&self) -> Result<ControlReply> {
        self.request(|reply| ControlMessage::Stop { reply }).await
    }

    /// Change the pacing interval (seconds, strictly positive)
    pub async fn set_interval(&self, seconds: f64) -> Result<ControlReply> {
        self.request(|reply| ControlMessage::SetInterval { seconds, reply })
            .await
    }

    /// Start from the first link containing `needle`
    pub async fn resume_from_link(&self, needle: impl Into<String>) -> Result<ControlReply> {
        let needle = needle.into();
        self.request(|reply| ControlMessage::ResumeFromLink { needle, reply })
            .await
    }

    /// Current controller state
    pub async fn status(&self) -> Result<StatusSnapshot> {
        self.request(|reply| ControlMessage::Status { reply }).await
    }

    /// Parse and execute a text command
    pub async fn execute(&self, input: &str) -> Result<ControlReply> {
        let command = match input.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return Ok(ControlReply::Usage(e.to_string())),
        };
        debug!(command = ?command, "Executing command");

        match command {
            Command::On => self.start(None).await,
            Command::Off => self.stop().await,
            Command::Status => Ok(ControlReply::Status(Box::new(self.status().await?))),
            Command::Setting(seconds) => self.set_interval(seconds).await,
            Command::Start(StartTarget::Index(index)) => self.start(Some(index)).await,
            Command::Start(StartTarget::Link(needle)) => self.resume_from_link(needle).await,
            Command::Help => Ok(ControlReply::Usage(USAGE.to_string())),
        }
    }
}
