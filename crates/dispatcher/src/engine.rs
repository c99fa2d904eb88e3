//! Dispatch engine - one resumable forwarding run
//!
//! A run prepares its inputs (captions, progress, channels), then walks the
//! aligned entries from `start_index`, sending one post per entry with a
//! pacing wait between successful sends. Only startup can fail a run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aligner::{AlignedBatch, SequenceAligner};
use contracts::{
    AlignedEntry, BatchItem, ForwarderBlueprint, MediaRef, MessagingProvider, OutgoingPost,
    PostMedia, ProgressRecord, ProviderError, TransferMode,
};
use ingestion::{extract_link, CaptionLoader, SourceChannels};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::caption::{format_caption, link_button};
use crate::error::Result;
use crate::event::{DispatchEvent, RunOutcome, RunReport, SkipReason};
use crate::metrics::DispatchMetrics;
use crate::progress::ProgressStore;

/// Static settings of the engine, taken from configuration
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub media_channel: String,
    pub links_channel: String,
    pub destination: String,
    pub captions_path: PathBuf,
    pub progress_path: PathBuf,
    pub prompt_text: String,
    pub transfer: TransferMode,
    /// Label of the inline link button, none for caption-only posts
    pub link_button: Option<String>,
    pub rate_limit_margin: Duration,
    pub transient_cooldown: Duration,
}

impl DispatchSettings {
    /// Extract engine settings from a blueprint
    pub fn from_blueprint(blueprint: &ForwarderBlueprint) -> Self {
        Self {
            media_channel: blueprint.channels.media.clone(),
            links_channel: blueprint.channels.links.clone(),
            destination: blueprint.channels.destination.clone(),
            captions_path: blueprint.captions.path.clone(),
            progress_path: blueprint.progress.path.clone(),
            prompt_text: blueprint.post.prompt_text.clone(),
            transfer: blueprint.post.transfer,
            link_button: blueprint.post.link_button.clone(),
            rate_limit_margin: blueprint.pacing.rate_limit_margin(),
            transient_cooldown: blueprint.pacing.transient_cooldown(),
        }
    }
}

/// Per-run wiring supplied by the controller
pub struct RunContext {
    pub run_id: u64,
    pub start_index: usize,
    /// Pacing interval, read at the start of every pacing wait
    pub interval: watch::Receiver<Duration>,
    /// Cooperative stop signal
    pub cancel: CancellationToken,
    /// Status line sink
    pub events: mpsc::UnboundedSender<DispatchEvent>,
    /// Latest persisted progress
    pub progress: watch::Sender<ProgressRecord>,
}

impl RunContext {
    fn emit(&self, event: DispatchEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

/// Inputs of a run, loaded at startup
struct Prepared {
    captions: Vec<String>,
    progress: ProgressRecord,
    batch: AlignedBatch,
}

/// Result of delivering one item
enum Delivery {
    Sent,
    Skipped(SkipReason),
    Cancelled,
}

/// Resumable batch forwarding engine
pub struct DispatchEngine<P> {
    provider: Arc<P>,
    settings: DispatchSettings,
    captions: CaptionLoader,
    store: ProgressStore,
}

impl<P> DispatchEngine<P>
where
    P: MessagingProvider + Send + Sync + 'static,
{
    /// Create an engine
    pub fn new(provider: Arc<P>, settings: DispatchSettings) -> Self {
        let captions = CaptionLoader::new(&settings.captions_path);
        let store = ProgressStore::new(&settings.progress_path);
        Self {
            provider,
            settings,
            captions,
            store,
        }
    }

    /// Engine settings
    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Progress store used by this engine
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Provider used by this engine
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Execute one run to its terminal state
    #[instrument(
        name = "dispatch_run",
        skip(self, ctx),
        fields(run_id = ctx.run_id, start_index = ctx.start_index)
    )]
    pub async fn run(&self, ctx: RunContext) -> RunReport {
        let metrics = DispatchMetrics::new();
        ctx.emit(DispatchEvent::Started {
            run_id: ctx.run_id,
            start_index: ctx.start_index,
        });
        info!("Dispatch run started");

        let report = match self.prepare().await {
            Ok(prepared) => self.dispatch_all(&ctx, prepared, &metrics).await,
            Err(e) => {
                error!(error = %e, "Dispatch run failed at startup");
                let progress = *ctx.progress.borrow();
                RunReport {
                    run_id: ctx.run_id,
                    outcome: RunOutcome::Failed(e.to_string()),
                    start_index: ctx.start_index,
                    total: 0,
                    last_sent: None,
                    progress,
                    metrics: metrics.snapshot(),
                }
            }
        };

        observability::record_run_finished(report.outcome.label());
        ctx.emit(DispatchEvent::Finished {
            run_id: report.run_id,
            outcome: report.outcome.clone(),
            sent: report.metrics.sent,
            skipped: report.metrics.skipped(),
        });
        info!(
            outcome = %report.outcome,
            sent = report.metrics.sent,
            skipped = report.metrics.skipped(),
            "Dispatch run finished"
        );
        report
    }

    /// Load captions and progress, enumerate and align the sources
    #[instrument(name = "dispatch_prepare", skip(self))]
    async fn prepare(&self) -> Result<Prepared> {
        let captions = self.captions.load().await?;
        let progress = self.store.load_existing()?.unwrap_or_default();
        let channels = SourceChannels::fetch(
            self.provider.as_ref(),
            &self.settings.media_channel,
            &self.settings.links_channel,
        )
        .await?;
        let batch = SequenceAligner::align(&channels.media, &channels.links, captions.len());

        Ok(Prepared {
            captions,
            progress,
            batch,
        })
    }

    async fn dispatch_all(
        &self,
        ctx: &RunContext,
        prepared: Prepared,
        metrics: &DispatchMetrics,
    ) -> RunReport {
        let Prepared {
            captions,
            progress,
            batch,
        } = prepared;
        let total = batch.total();

        let mut report = RunReport {
            run_id: ctx.run_id,
            outcome: RunOutcome::Completed,
            start_index: ctx.start_index,
            total,
            last_sent: None,
            progress,
            metrics: metrics.snapshot(),
        };

        if captions.is_empty() || total == 0 {
            let reason = if captions.is_empty() {
                "caption list is empty".to_string()
            } else {
                "no aligned posts".to_string()
            };
            info!(reason = %reason, "Nothing to send");
            ctx.emit(DispatchEvent::NothingToSend {
                run_id: ctx.run_id,
                reason,
            });
            return report;
        }

        ctx.emit(DispatchEvent::Prepared {
            run_id: ctx.run_id,
            total,
            captions: captions.len(),
        });
        info!(total, captions = captions.len(), "Dispatching");

        // a hand-edited record may hold any cursor
        let mut caption_index = progress.caption_index % captions.len();

        for entry in batch.iter_from(ctx.start_index) {
            if ctx.cancel.is_cancelled() {
                report.outcome = RunOutcome::Stopped;
                break;
            }

            let item = match build_item(entry, &captions, caption_index) {
                Ok(item) => item,
                Err(reason) => {
                    self.skip(ctx, metrics, entry.index, reason);
                    continue;
                }
            };

            match self.deliver(ctx, metrics, &item).await {
                Delivery::Sent => {
                    caption_index = (caption_index + 1) % captions.len();
                    let record = ProgressRecord::new(item.index, caption_index);
                    self.commit(ctx, metrics, &record);
                    report.last_sent = Some(item.index);
                    report.progress = record;

                    ctx.emit(DispatchEvent::Sent {
                        index: item.index,
                        total,
                        caption_name: item.caption_name.clone(),
                    });

                    if item.index + 1 < total && !self.pace(ctx).await {
                        report.outcome = RunOutcome::Stopped;
                        break;
                    }
                }
                Delivery::Skipped(reason) => self.skip(ctx, metrics, item.index, reason),
                Delivery::Cancelled => {
                    report.outcome = RunOutcome::Stopped;
                    break;
                }
            }
        }

        report.metrics = metrics.snapshot();
        report
    }

    /// Send one item, handling rate limits and stale handles
    #[instrument(
        name = "dispatch_deliver",
        skip(self, ctx, metrics, item),
        fields(index = item.index, message_id = item.media.message_id)
    )]
    async fn deliver(
        &self,
        ctx: &RunContext,
        metrics: &DispatchMetrics,
        item: &BatchItem,
    ) -> Delivery {
        let mut media = item.media.clone();
        let mut refreshed = false;

        loop {
            let err = match self.send(item, &media).await {
                Ok(()) => return Delivery::Sent,
                Err(err) => err,
            };

            match err {
                ProviderError::RateLimited { wait } => {
                    let pause = wait.saturating_add(self.settings.rate_limit_margin);
                    metrics.inc_rate_limited();
                    observability::record_rate_limited(pause);
                    warn!(wait_secs = pause.as_secs_f64(), "Rate limited, retrying same index");
                    ctx.emit(DispatchEvent::RateLimited {
                        index: item.index,
                        wait: pause,
                    });
                    if !wait_or_cancel(pause, &ctx.cancel).await {
                        return Delivery::Cancelled;
                    }
                }
                ProviderError::StaleReference { message } if !refreshed => {
                    refreshed = true;
                    debug!(reason = %message, "Stale media handle, refreshing");
                    match self
                        .provider
                        .refresh(&self.settings.media_channel, &media)
                        .await
                    {
                        Ok(fresh) => {
                            metrics.inc_refresh();
                            ctx.emit(DispatchEvent::Refreshed { index: item.index });
                            media = fresh;
                        }
                        Err(e) => {
                            return Delivery::Skipped(SkipReason::StaleReference(e.to_string()));
                        }
                    }
                }
                ProviderError::StaleReference { message } => {
                    return Delivery::Skipped(SkipReason::StaleReference(message));
                }
                other => {
                    warn!(
                        error = %other,
                        transient = other.is_transient(),
                        cooldown_secs = self.settings.transient_cooldown.as_secs_f64(),
                        "Send failed, skipping after cooldown"
                    );
                    if !wait_or_cancel(self.settings.transient_cooldown, &ctx.cancel).await {
                        // The item is skipped either way; stop right after
                        self.skip(
                            ctx,
                            metrics,
                            item.index,
                            SkipReason::ProviderFailure(other.to_string()),
                        );
                        return Delivery::Cancelled;
                    }
                    return Delivery::Skipped(SkipReason::ProviderFailure(other.to_string()));
                }
            }
        }
    }

    /// One send attempt in the configured transfer mode
    async fn send(&self, item: &BatchItem, media: &MediaRef) -> std::result::Result<(), ProviderError> {
        let post_media = match self.settings.transfer {
            TransferMode::Forward => PostMedia::Reference(media.clone()),
            TransferMode::Reupload => PostMedia::Staged(self.provider.download(media).await?),
        };

        let post = OutgoingPost {
            media: post_media,
            caption: format_caption(&item.caption_name, &self.settings.prompt_text, &item.link),
            buttons: self
                .settings
                .link_button
                .as_deref()
                .map(|label| vec![link_button(label, &item.link)])
                .unwrap_or_default(),
        };

        self.provider
            .send_post(&self.settings.destination, &post)
            .await
    }

    /// Persist and publish progress after a successful send
    fn commit(&self, ctx: &RunContext, metrics: &DispatchMetrics, record: &ProgressRecord) {
        metrics.inc_sent();
        observability::record_post_sent(record.last_index, record.caption_index);

        if let Err(e) = self.store.save(record) {
            // The post is out; a later restart may resend it
            metrics.inc_persist_failures();
            observability::record_progress_write_failure();
            error!(error = %e, last_index = record.last_index, "Failed to persist progress");
        }
        ctx.progress.send_replace(*record);
    }

    fn skip(&self, ctx: &RunContext, metrics: &DispatchMetrics, index: usize, reason: SkipReason) {
        if reason.is_missing_content() {
            metrics.inc_missing();
        } else {
            metrics.inc_failed();
        }
        observability::record_post_skipped(reason.label());
        warn!(index, reason = %reason, "Item skipped");
        ctx.emit(DispatchEvent::Skipped { index, reason });
    }

    /// Wait the current interval; false if stopped meanwhile
    async fn pace(&self, ctx: &RunContext) -> bool {
        let interval = *ctx.interval.borrow();
        debug!(interval_secs = interval.as_secs_f64(), "Pacing");
        wait_or_cancel(interval, &ctx.cancel).await
    }
}

/// Resolve link, media and caption of an aligned entry
fn build_item(
    entry: &AlignedEntry,
    captions: &[String],
    caption_index: usize,
) -> std::result::Result<BatchItem, SkipReason> {
    let link = entry
        .link_text
        .as_deref()
        .and_then(extract_link)
        .ok_or(SkipReason::MissingLink)?;
    let media = entry.media.clone().ok_or(SkipReason::MissingMedia)?;

    Ok(BatchItem {
        index: entry.index,
        media,
        link,
        caption_name: captions[caption_index % captions.len()].clone(),
    })
}

/// Sleep unless cancelled first; true if the full wait elapsed
async fn wait_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MediaKind, SourceMessage};
    use provider::MockProvider;
    use tempfile::TempDir;
    use tokio::time::Instant;

    struct Harness {
        _dir: TempDir,
        engine: DispatchEngine<MockProvider>,
        provider: Arc<MockProvider>,
        interval_tx: watch::Sender<Duration>,
        progress_tx: watch::Sender<ProgressRecord>,
        events_rx: mpsc::UnboundedReceiver<DispatchEvent>,
        events_tx: mpsc::UnboundedSender<DispatchEvent>,
    }

    impl Harness {
        fn context(&self, start_index: usize, cancel: CancellationToken) -> RunContext {
            RunContext {
                run_id: 1,
                start_index,
                interval: self.interval_tx.subscribe(),
                cancel,
                events: self.events_tx.clone(),
                progress: self.progress_tx.clone(),
            }
        }

        fn drain_events(&mut self) -> Vec<DispatchEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events_rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn media_channel(n: i64) -> Vec<SourceMessage> {
        (1..=n)
            .map(|id| SourceMessage::media(id, MediaKind::Photo, format!("f{id}")))
            .collect()
    }

    fn link_channel(n: i64) -> Vec<SourceMessage> {
        (1..=n)
            .map(|id| SourceMessage::text(100 + id, format!("ep {id} http://l/{id}")))
            .collect()
    }

    fn harness(
        provider: MockProvider,
        captions: &str,
        configure: impl FnOnce(&mut DispatchSettings),
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let captions_path = dir.path().join("captions.txt");
        std::fs::write(&captions_path, captions).unwrap();

        let mut settings = DispatchSettings {
            media_channel: "media".to_string(),
            links_channel: "links".to_string(),
            destination: "target".to_string(),
            captions_path,
            progress_path: dir.path().join("progress.json"),
            prompt_text: "watch here".to_string(),
            transfer: TransferMode::Forward,
            link_button: None,
            rate_limit_margin: Duration::from_secs(5),
            transient_cooldown: Duration::from_secs(10),
        };
        configure(&mut settings);

        let provider = Arc::new(provider);
        let engine = DispatchEngine::new(Arc::clone(&provider), settings);
        let (interval_tx, _) = watch::channel(Duration::from_secs(1));
        let (progress_tx, _) = watch::channel(ProgressRecord::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Harness {
            _dir: dir,
            engine,
            provider,
            interval_tx,
            progress_tx,
            events_rx,
            events_tx,
        }
    }

    fn standard_provider(n: i64) -> MockProvider {
        MockProvider::new()
            .with_channel("media", media_channel(n))
            .with_channel("links", link_channel(n))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_all_with_rotating_captions() {
        let h = harness(standard_provider(3), "Alice\nBob\nCarol\n", |_| {});
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.metrics.sent, 3);
        assert_eq!(report.last_sent, Some(2));

        let sent = h.provider.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].caption, "Alice\n\nwatch here\nhttp://l/1");
        assert_eq!(sent[1].caption, "Bob\n\nwatch here\nhttp://l/2");
        assert_eq!(sent[2].caption, "Carol\n\nwatch here\nhttp://l/3");
        assert!(sent.iter().all(|post| post.destination == "target"));

        // caption_index == successful sends mod caption count
        assert_eq!(report.progress, ProgressRecord::new(2, 0));
        assert_eq!(h.engine.store().load(), ProgressRecord::new(2, 0));
        assert_eq!(*h.progress_tx.borrow(), ProgressRecord::new(2, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_caption_cursor_wraps() {
        let h = harness(standard_provider(2), "Alice\nBob\n", |_| {});
        h.engine
            .store()
            .save(&ProgressRecord::new(0, usize::MAX))
            .unwrap();

        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        let sent = h.provider.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].caption.starts_with("Bob\n"));
        assert!(sent[1].caption.starts_with("Alice\n"));
        assert_eq!(report.progress, ProgressRecord::new(1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_wait_saturates() {
        let provider = standard_provider(1);
        provider.script_send_failures(1, [ProviderError::RateLimited { wait: Duration::MAX }]);
        let h = harness(provider, "Alice\n", |_| {});
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            stopper.cancel();
        });

        let report = h.engine.run(h.context(0, cancel)).await;

        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert_eq!(report.metrics.rate_limited, 1);
        assert!(h.provider.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_is_bounded_by_caption_count() {
        let h = harness(standard_provider(5), "Alice\nBob\n", |_| {});
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;
        assert_eq!(report.total, 2);
        assert_eq!(h.provider.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paces_between_sends() {
        let h = harness(standard_provider(3), "A\nB\nC\n", |_| {});
        h.interval_tx.send_replace(Duration::from_secs(60));

        let started = Instant::now();
        h.engine.run(h.context(0, CancellationToken::new())).await;
        // two waits between three sends
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_parts_are_skipped_without_caption_advance() {
        let provider = MockProvider::new()
            .with_channel(
                "media",
                vec![
                    SourceMessage::media(1, MediaKind::Photo, "f1"),
                    SourceMessage::media(2, MediaKind::Photo, "f2"),
                    SourceMessage::empty(3),
                    SourceMessage::media(4, MediaKind::Video, "f4"),
                ],
            )
            .with_channel(
                "links",
                vec![
                    SourceMessage::text(11, "http://l/1"),
                    SourceMessage::text(12, "no link in this one"),
                    SourceMessage::text(13, "http://l/3"),
                    SourceMessage::text(14, "http://l/4"),
                ],
            );
        let mut h = harness(provider, "A\nB\nC\nD\n", |_| {});
        let started = Instant::now();
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.metrics.sent, 2);
        assert_eq!(report.metrics.skipped_missing, 2);
        let sent = h.provider.sent();
        assert!(sent[0].caption.starts_with("A\n"));
        assert!(sent[1].caption.starts_with("B\n"));
        assert_eq!(report.progress, ProgressRecord::new(3, 2));
        // no cooldown for missing content, one pacing wait
        assert_eq!(started.elapsed(), Duration::from_secs(1));

        let skipped: Vec<_> = h
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                DispatchEvent::Skipped { index, reason } => Some((index, reason)),
                _ => None,
            })
            .collect();
        assert_eq!(
            skipped,
            vec![(1, SkipReason::MissingLink), (2, SkipReason::MissingMedia)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_same_index() {
        let provider = standard_provider(1);
        provider.script_send_failures(1, [ProviderError::rate_limited(3)]);
        let h = harness(provider, "A\n", |_| {});

        let started = Instant::now();
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.metrics.sent, 1);
        assert_eq!(report.metrics.skipped(), 0);
        assert_eq!(report.metrics.rate_limited, 1);
        assert_eq!(h.provider.send_attempts(), 2);
        assert_eq!(h.provider.sent().len(), 1);
        assert!(started.elapsed() >= Duration::from_secs(3 + 5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reference_refreshes_once() {
        let provider = standard_provider(2);
        provider.script_send_failures(1, [ProviderError::stale("expired")]);
        provider.script_send_failures(
            2,
            [ProviderError::stale("expired"), ProviderError::stale("still")],
        );
        let h = harness(provider, "A\nB\n", |_| {});

        let started = Instant::now();
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.metrics.sent, 1);
        assert_eq!(report.metrics.skipped_failed, 1);
        assert_eq!(report.metrics.refreshed, 2);
        assert_eq!(h.provider.refresh_count(), 2);
        assert_eq!(h.provider.send_attempts(), 4);
        // stale skip has no cooldown; one pacing wait after the first send
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_skips() {
        let provider = standard_provider(1);
        provider.script_send_failures(1, [ProviderError::stale("expired")]);
        provider.fail_refresh(1);
        let h = harness(provider, "A\n", |_| {});

        let report = h.engine.run(h.context(0, CancellationToken::new())).await;
        assert_eq!(report.metrics.sent, 0);
        assert_eq!(report.metrics.skipped_failed, 1);
        assert_eq!(report.progress, ProgressRecord::default());
        assert_eq!(h.engine.store().load_existing().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_cools_down_and_skips() {
        let provider = standard_provider(2);
        provider.script_send_failures(1, [ProviderError::connection("reset")]);
        let h = harness(provider, "A\nB\n", |_| {});

        let started = Instant::now();
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.metrics.skipped_failed, 1);
        assert_eq!(report.metrics.sent, 1);
        // the caption cursor did not move for the failed item
        assert!(h.provider.sent()[0].caption.starts_with("A\n"));
        assert_eq!(report.progress, ProgressRecord::new(1, 1));
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_from_persisted_caption_cursor() {
        let h = harness(standard_provider(4), "A\nB\nC\n", |_| {});
        h.engine.store().save(&ProgressRecord::new(1, 2)).unwrap();

        let report = h.engine.run(h.context(2, CancellationToken::new())).await;

        let sent = h.provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].media.message_id, 3);
        assert!(sent[0].caption.starts_with("C\n"));
        assert_eq!(report.progress, ProgressRecord::new(2, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_pacing() {
        let h = harness(standard_provider(3), "A\nB\nC\n", |_| {});
        h.interval_tx.send_replace(Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let ctx = h.context(0, cancel.clone());

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            cancel.cancel();
        });

        let started = Instant::now();
        let report = h.engine.run(ctx).await;
        stopper.await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Stopped);
        assert_eq!(report.metrics.sent, 1);
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_to_next_wait() {
        let h = harness(standard_provider(3), "A\nB\nC\n", |_| {});
        h.interval_tx.send_replace(Duration::from_secs(100));
        let interval_tx = h.interval_tx.clone();

        let changer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(50)).await;
            interval_tx.send_replace(Duration::from_secs_f64(2.5));
        });

        let started = Instant::now();
        h.engine.run(h.context(0, CancellationToken::new())).await;
        changer.await.unwrap();

        // the wait in progress keeps its length, the next one uses 2.5s
        assert_eq!(started.elapsed(), Duration::from_secs_f64(102.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_captions_is_nothing_to_send() {
        let mut h = harness(standard_provider(3), "\n  \n", |_| {});
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.metrics.sent, 0);
        assert!(h
            .drain_events()
            .iter()
            .any(|event| matches!(event, DispatchEvent::NothingToSend { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_caption_file_is_nothing_to_send() {
        let h = harness(standard_provider(3), "A\n", |settings| {
            settings.captions_path = settings.captions_path.with_file_name("absent.txt");
        });
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(h.provider.send_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_progress_fails_run() {
        let h = harness(standard_provider(3), "A\n", |settings| {
            // a directory cannot be read as a progress file
            settings.progress_path = settings.captions_path.parent().unwrap().to_path_buf();
        });
        let report = h.engine.run(h.context(0, CancellationToken::new())).await;
        assert!(matches!(report.outcome, RunOutcome::Failed(_)));
        assert_eq!(h.provider.send_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_failure_fails_run() {
        let provider = standard_provider(3);
        provider.fail_history("media", ProviderError::session("logged out"));
        let h = harness(provider, "A\n", |_| {});

        let report = h.engine.run(h.context(0, CancellationToken::new())).await;
        match report.outcome {
            RunOutcome::Failed(msg) => assert!(msg.contains("media")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reupload_with_link_button() {
        let provider = MockProvider::new()
            .with_channel("media", media_channel(1))
            .with_channel("links", vec![SourceMessage::text(9, "go www.site.org/ep1 now")]);
        let h = harness(provider, "A\n", |settings| {
            settings.transfer = TransferMode::Reupload;
            settings.link_button = Some("Watch".to_string());
        });

        h.engine.run(h.context(0, CancellationToken::new())).await;

        let sent = h.provider.sent();
        assert_eq!(h.provider.download_count(), 1);
        assert!(sent[0].staged);
        assert_eq!(sent[0].buttons[0].label, "Watch");
        assert_eq!(sent[0].buttons[0].url, "https://www.site.org/ep1");
        assert_eq!(sent[0].caption, "A\n\nwatch here\nwww.site.org/ep1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_past_end_sends_nothing() {
        let h = harness(standard_provider(2), "A\nB\n", |_| {});
        let report = h.engine.run(h.context(7, CancellationToken::new())).await;
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.metrics.sent, 0);
        assert_eq!(report.last_sent, None);
    }
}
