//! `run` command implementation.

use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use control::{ControlHandle, Controller, ControllerSettings};
use dispatcher::{DispatchEngine, DispatchEvent, DispatchSettings};
use observability::SessionAggregator;
use provider::AnyProvider;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;

/// Poll period while waiting for an active run after stdin closed
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Reject an `--interval` that cannot become a positive [`Duration`]
fn check_interval(interval: f64) -> Result<(), CliError> {
    if !interval.is_finite() || interval <= 0.0 {
        return Err(CliError::invalid_override(
            "--interval",
            format!("{interval} is not a positive number of seconds"),
        ));
    }
    if Duration::try_from_secs_f64(interval).is_err() {
        return Err(CliError::invalid_override(
            "--interval",
            format!("{interval} seconds is out of range"),
        ));
    }
    Ok(())
}

/// Execute the `run` command
pub async fn run_forwarder(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(interval) = args.interval {
        check_interval(interval)?;
        info!(interval_secs = interval, "Overriding interval from CLI");
        blueprint.pacing.interval_secs = interval;
        config_loader::ConfigLoader::validate(&blueprint)?;
    }

    info!(
        media = %blueprint.channels.media,
        links = %blueprint.channels.links,
        destination = %blueprint.channels.destination,
        provider = ?blueprint.provider.kind,
        interval_secs = blueprint.pacing.interval_secs,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let provider = AnyProvider::from_config(&blueprint.provider, &blueprint.channels)
        .map_err(CliError::from)?;
    let engine = Arc::new(DispatchEngine::new(
        Arc::new(provider),
        DispatchSettings::from_blueprint(&blueprint),
    ));

    let mut settings = ControllerSettings::from_blueprint(&blueprint);
    settings.start_override = args.start_index;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let controller = Controller::spawn(engine, settings, events_tx).map_err(CliError::from)?;
    let printer = spawn_event_printer(events_rx);
    let handle = controller.handle();

    if args.autostart {
        let reply = handle.start(None).await.map_err(CliError::from)?;
        println!("{reply}");
    }

    let shutdown_signal = setup_shutdown_signal();
    tokio::pin!(shutdown_signal);

    println!("Ready. Commands: on, off, status, setting <seconds>, start <index|link>, help");

    tokio::select! {
        result = command_loop(&handle) => {
            result?;
            info!("Input closed, waiting for the active run to finish");
            tokio::select! {
                _ = wait_idle(&handle) => {}
                _ = &mut shutdown_signal => {
                    warn!("Received shutdown signal, stopping forwarder...");
                }
            }
        }
        _ = &mut shutdown_signal => {
            warn!("Received shutdown signal, stopping forwarder...");
        }
    }

    controller.shutdown().await;

    let session = printer.await.context("Event printer task failed")?;
    if session.run_count() > 0 {
        println!("\n{}", session.summary());
    }

    info!("postrelay finished");
    Ok(())
}

/// Forward stdin lines to the controller until EOF
async fn command_loop(handle: &ControlHandle) -> Result<()> {
    let mut lines = spawn_stdin_reader();

    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle.execute(&line).await.map_err(CliError::from)?;
        println!("{reply}");
    }

    Ok(())
}

/// Read stdin on a dedicated thread
///
/// A blocking read inside the runtime would hold up shutdown until the next
/// line arrives.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });
    rx
}

/// Return once no run is executing or unwinding
async fn wait_idle(handle: &ControlHandle) {
    loop {
        match handle.status().await {
            Ok(status) if status.active_run.is_some() => tokio::time::sleep(IDLE_POLL).await,
            _ => return,
        }
    }
}

/// Print every dispatch event and fold finished runs into a session summary
fn spawn_event_printer(
    mut events: mpsc::UnboundedReceiver<DispatchEvent>,
) -> JoinHandle<SessionAggregator> {
    tokio::spawn(async move {
        let mut session = SessionAggregator::new();
        let mut run_started = Instant::now();
        let mut rate_limited = 0u64;

        while let Some(event) = events.recv().await {
            println!("{event}");
            match &event {
                DispatchEvent::Started { .. } => {
                    run_started = Instant::now();
                    rate_limited = 0;
                }
                DispatchEvent::RateLimited { .. } => rate_limited += 1,
                DispatchEvent::Finished {
                    outcome,
                    sent,
                    skipped,
                    ..
                } => session.update(
                    outcome.label(),
                    *sent,
                    *skipped,
                    rate_limited,
                    run_started.elapsed(),
                ),
                _ => {}
            }
        }

        session
    })
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
