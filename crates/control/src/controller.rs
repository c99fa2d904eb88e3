//! Control state machine
//!
//! All control state lives in one task. Requests arrive over a bounded
//! queue; engine runs and link lookups execute in their own tasks and post
//! their results back into the same queue, so state is never shared.

use std::sync::Arc;
use std::time::Duration;

use aligner::LinkLocator;
use contracts::{ForwarderBlueprint, MessagingProvider, ProgressRecord};
use dispatcher::{DispatchEngine, DispatchEvent, RunContext, RunOutcome, RunReport};
use ingestion::read_channel;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::handle::ControlHandle;
use crate::reply::{ControlReply, StatusSnapshot};

/// Controller settings, taken from configuration
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Initial pacing interval
    pub interval: Duration,
    /// Start index used when nothing has been persisted yet
    pub start_index: usize,
    /// Start index that wins over persisted progress
    pub start_override: Option<usize>,
    /// Request queue capacity
    pub queue_capacity: usize,
}

impl ControllerSettings {
    /// Extract controller settings from a blueprint
    pub fn from_blueprint(blueprint: &ForwarderBlueprint) -> Self {
        Self {
            interval: blueprint.pacing.interval(),
            start_index: blueprint.pacing.start_index,
            start_override: None,
            queue_capacity: blueprint.control.queue_capacity,
        }
    }
}

/// Messages processed by the control loop
pub(crate) enum ControlMessage {
    Start {
        from_index: Option<usize>,
        reply: oneshot::Sender<ControlReply>,
    },
    Stop {
        reply: oneshot::Sender<ControlReply>,
    },
    SetInterval {
        seconds: f64,
        reply: oneshot::Sender<ControlReply>,
    },
    ResumeFromLink {
        needle: String,
        reply: oneshot::Sender<ControlReply>,
    },
    LinkLocated {
        needle: String,
        result: std::result::Result<Option<usize>, String>,
        reply: oneshot::Sender<ControlReply>,
    },
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
    RunFinished {
        run_id: u64,
        report: RunReport,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Run currently executing or unwinding
struct ActiveRun {
    run_id: u64,
    cancel: CancellationToken,
}

/// Owned control state
struct ControlState<P> {
    engine: Arc<DispatchEngine<P>>,
    running: bool,
    start_index: usize,
    caption_index: usize,
    active_run: Option<ActiveRun>,
    last_outcome: Option<RunOutcome>,
    next_run_id: u64,
    interval: watch::Sender<Duration>,
    progress: watch::Sender<ProgressRecord>,
    events: mpsc::UnboundedSender<DispatchEvent>,
    /// Back channel for run and lookup results
    mailbox: mpsc::WeakSender<ControlMessage>,
    shutdown_waiter: Option<oneshot::Sender<()>>,
}

/// Running control loop
pub struct Controller {
    handle: ControlHandle,
    worker: JoinHandle<()>,
    progress: watch::Receiver<ProgressRecord>,
}

impl Controller {
    /// Seed state from persisted progress and spawn the control loop
    ///
    /// Dispatch events of every run are forwarded to `events`.
    #[instrument(name = "controller_spawn", skip_all)]
    pub fn spawn<P>(
        engine: Arc<DispatchEngine<P>>,
        settings: ControllerSettings,
        events: mpsc::UnboundedSender<DispatchEvent>,
    ) -> Result<Self>
    where
        P: MessagingProvider + Send + Sync + 'static,
    {
        let persisted = engine.store().load_existing()?;
        let start_index = settings.start_override.unwrap_or_else(|| {
            persisted
                .map(|record| record.next_index())
                .unwrap_or(settings.start_index)
        });
        let progress_record = persisted.unwrap_or_default();
        info!(
            start_index,
            caption_index = progress_record.caption_index,
            resumed = persisted.is_some(),
            "Controller seeded"
        );

        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let (interval_tx, _) = watch::channel(settings.interval);
        let (progress_tx, progress_rx) = watch::channel(progress_record);

        let state = ControlState {
            engine,
            running: false,
            start_index,
            caption_index: progress_record.caption_index,
            active_run: None,
            last_outcome: None,
            next_run_id: 0,
            interval: interval_tx,
            progress: progress_tx,
            events,
            mailbox: tx.downgrade(),
            shutdown_waiter: None,
        };

        let worker = tokio::spawn(control_loop(state, rx));

        Ok(Self {
            handle: ControlHandle::new(tx),
            worker,
            progress: progress_rx,
        })
    }

    /// Cloneable request handle
    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    /// Latest persisted progress, updated after every successful send
    pub fn progress(&self) -> watch::Receiver<ProgressRecord> {
        self.progress.clone()
    }

    /// Stop any active run, wait for it to unwind, then end the loop
    #[instrument(name = "controller_shutdown", skip(self))]
    pub async fn shutdown(self) {
        let (reply, done) = oneshot::channel();
        if self
            .handle
            .send(ControlMessage::Shutdown { reply })
            .await
            .is_ok()
        {
            let _ = done.await;
        }
        drop(self.handle);
        if let Err(e) = self.worker.await {
            error!(error = ?e, "Control loop panicked");
        }
        debug!("Controller shutdown complete");
    }
}

#[instrument(name = "control_loop", skip_all)]
async fn control_loop<P>(mut state: ControlState<P>, mut rx: mpsc::Receiver<ControlMessage>)
where
    P: MessagingProvider + Send + Sync + 'static,
{
    debug!("Control loop started");

    while let Some(message) = rx.recv().await {
        match message {
            ControlMessage::Start { from_index, reply } => {
                let index = from_index.unwrap_or(state.start_index);
                let _ = reply.send(state.start(index));
            }
            ControlMessage::Stop { reply } => {
                let _ = reply.send(state.stop());
            }
            ControlMessage::SetInterval { seconds, reply } => {
                let _ = reply.send(state.set_interval(seconds));
            }
            ControlMessage::ResumeFromLink { needle, reply } => {
                state.resume_from_link(needle, reply);
            }
            ControlMessage::LinkLocated {
                needle,
                result,
                reply,
            } => {
                let response = match result {
                    Ok(Some(index)) => {
                        info!(needle = %needle, index, "Link located");
                        state.start(index)
                    }
                    Ok(None) => ControlReply::NotFound(needle),
                    Err(reason) => ControlReply::LookupFailed(reason),
                };
                let _ = reply.send(response);
            }
            ControlMessage::Status { reply } => {
                let _ = reply.send(state.status());
            }
            ControlMessage::RunFinished { run_id, report } => {
                state.finish(run_id, report);
                if state.active_run.is_none() {
                    if let Some(waiter) = state.shutdown_waiter.take() {
                        let _ = waiter.send(());
                        break;
                    }
                }
            }
            ControlMessage::Shutdown { reply } => {
                state.stop();
                if state.active_run.is_none() {
                    let _ = reply.send(());
                    break;
                }
                state.shutdown_waiter = Some(reply);
            }
        }
    }

    debug!("Control loop stopped");
}

impl<P> ControlState<P>
where
    P: MessagingProvider + Send + Sync + 'static,
{
    /// Launch a run unless one is running or still unwinding
    fn start(&mut self, start_index: usize) -> ControlReply {
        if self.shutdown_waiter.is_some() {
            return ControlReply::ShuttingDown;
        }
        if self.running || self.active_run.is_some() {
            return ControlReply::AlreadyRunning;
        }
        let Some(mailbox) = self.mailbox.upgrade() else {
            return ControlReply::ShuttingDown;
        };

        self.next_run_id += 1;
        let run_id = self.next_run_id;
        let cancel = CancellationToken::new();
        let ctx = RunContext {
            run_id,
            start_index,
            interval: self.interval.subscribe(),
            cancel: cancel.clone(),
            events: self.events.clone(),
            progress: self.progress.clone(),
        };

        let engine = Arc::clone(&self.engine);
        let fallback_progress = self.progress.subscribe();
        tokio::spawn(async move {
            let report = match tokio::spawn(async move { engine.run(ctx).await }).await {
                Ok(report) => report,
                Err(e) => {
                    error!(run_id, error = ?e, "Dispatch run panicked");
                    let progress = *fallback_progress.borrow();
                    RunReport {
                        run_id,
                        outcome: RunOutcome::Failed(format!("run task panicked: {e}")),
                        start_index,
                        total: 0,
                        last_sent: None,
                        progress,
                        metrics: Default::default(),
                    }
                }
            };
            let _ = mailbox
                .send(ControlMessage::RunFinished { run_id, report })
                .await;
        });

        self.active_run = Some(ActiveRun { run_id, cancel });
        self.running = true;
        self.start_index = start_index;
        info!(run_id, start_index, "Run launched");
        ControlReply::Started {
            run_id,
            start_index,
        }
    }

    /// Request a cooperative stop; idempotent
    fn stop(&mut self) -> ControlReply {
        self.running = false;
        if let Some(active) = &self.active_run {
            if !active.cancel.is_cancelled() {
                info!(run_id = active.run_id, "Stop requested");
                active.cancel.cancel();
            }
        }
        ControlReply::Stopped
    }

    /// Change the pacing interval from the next wait on
    fn set_interval(&mut self, seconds: f64) -> ControlReply {
        if !seconds.is_finite() || seconds <= 0.0 {
            return ControlReply::IntervalRejected(format!(
                "{seconds} is not a positive number of seconds"
            ));
        }
        let Ok(interval) = Duration::try_from_secs_f64(seconds) else {
            return ControlReply::IntervalRejected(format!("{seconds} is out of range"));
        };

        self.interval.send_replace(interval);
        info!(interval_secs = seconds, "Interval changed");
        ControlReply::IntervalSet(interval)
    }

    /// Look the link up off-loop, then start from the match
    fn resume_from_link(&mut self, needle: String, reply: oneshot::Sender<ControlReply>) {
        let needle = needle.trim().to_string();
        if needle.is_empty() {
            let _ = reply.send(ControlReply::Usage("start <index|link>".to_string()));
            return;
        }
        if self.running || self.active_run.is_some() {
            let _ = reply.send(ControlReply::AlreadyRunning);
            return;
        }
        let Some(mailbox) = self.mailbox.upgrade() else {
            let _ = reply.send(ControlReply::ShuttingDown);
            return;
        };

        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            let links_channel = engine.settings().links_channel.clone();
            let result = read_channel(engine.provider().as_ref(), &links_channel)
                .await
                .map(|links| LinkLocator::locate(&links, &needle))
                .map_err(|e| {
                    warn!(error = %e, "Link lookup failed");
                    e.to_string()
                });
            let _ = mailbox
                .send(ControlMessage::LinkLocated {
                    needle,
                    result,
                    reply,
                })
                .await;
        });
    }

    /// Apply a terminal run report
    fn finish(&mut self, run_id: u64, report: RunReport) {
        match &self.active_run {
            Some(active) if active.run_id == run_id => {}
            _ => {
                warn!(run_id, "Report for unknown run ignored");
                return;
            }
        }

        self.active_run = None;
        self.running = false;
        if let Some(next) = report.resume_index() {
            self.start_index = next;
        }
        self.caption_index = report.progress.caption_index;
        info!(
            run_id,
            outcome = %report.outcome,
            next_start_index = self.start_index,
            "Run finished"
        );
        self.last_outcome = Some(report.outcome);
    }

    fn status(&self) -> StatusSnapshot {
        let progress = *self.progress.borrow();
        let settings = self.engine.settings();
        StatusSnapshot {
            running: self.running,
            interval: *self.interval.borrow(),
            start_index: self.start_index,
            caption_index: if self.active_run.is_some() {
                progress.caption_index
            } else {
                self.caption_index
            },
            active_run: self.active_run.as_ref().map(|active| active.run_id),
            progress,
            last_outcome: self.last_outcome.clone(),
            media_channel: settings.media_channel.clone(),
            links_channel: settings.links_channel.clone(),
            destination: settings.destination.clone(),
        }
    }
}
