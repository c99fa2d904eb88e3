//! # Integration Tests
//!
//! End-to-end scenarios against the mock and replay providers.
//!
//! Covers:
//! - Configuration to running controller
//! - Restart continuation from persisted progress
//! - Rate-limit, stale-reference and transient-failure handling
//! - At most one active run under arbitrary command sequences

#[cfg(test)]
mod harness {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ForwarderBlueprint, MediaKind, SourceMessage};
    use control::{ControlHandle, Controller, ControllerSettings, StatusSnapshot};
    use dispatcher::{DispatchEngine, DispatchEvent, DispatchSettings};
    use provider::MockProvider;
    use tokio::sync::mpsc;

    /// Blueprint for a mock provider with files under `dir`
    pub fn blueprint(dir: &Path, captions: &[&str]) -> ForwarderBlueprint {
        let captions_path = dir.join("captions.txt");
        std::fs::write(&captions_path, captions.join("\n")).unwrap();

        let toml = format!(
            r#"
[channels]
media = "media-src"
links = "link-src"
destination = "target"

[captions]
path = "{}"

[progress]
path = "{}"

[pacing]
interval_secs = 10.0
rate_limit_margin_secs = 1.0
transient_cooldown_secs = 5.0

[provider]
kind = "mock"
"#,
            captions_path.display(),
            progress_path(dir).display()
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    pub fn progress_path(dir: &Path) -> PathBuf {
        dir.join("state").join("progress.json")
    }

    /// Mock provider holding `count` media/link pairs, ids starting at 1
    pub fn seeded_provider(count: i64) -> Arc<MockProvider> {
        let media = (1..=count)
            .map(|id| SourceMessage::media(id, MediaKind::Video, format!("file-{id}")))
            .collect();
        let links = (1..=count)
            .map(|id| SourceMessage::text(100 + id, format!("part {id} https://example.com/v/{id}")))
            .collect();
        Arc::new(
            MockProvider::new()
                .with_channel("media-src", media)
                .with_channel("link-src", links),
        )
    }

    pub struct Running {
        pub controller: Controller,
        pub handle: ControlHandle,
        pub events: mpsc::UnboundedReceiver<DispatchEvent>,
    }

    pub fn spawn(blueprint: &ForwarderBlueprint, provider: &Arc<MockProvider>) -> Running {
        let engine = Arc::new(DispatchEngine::new(
            Arc::clone(provider),
            DispatchSettings::from_blueprint(blueprint),
        ));
        let (events_tx, events) = mpsc::unbounded_channel();
        let controller = Controller::spawn(
            engine,
            ControllerSettings::from_blueprint(blueprint),
            events_tx,
        )
        .unwrap();
        let handle = controller.handle();
        Running {
            controller,
            handle,
            events,
        }
    }

    pub async fn wait_idle(handle: &ControlHandle) -> StatusSnapshot {
        loop {
            let status = handle.status().await.unwrap();
            if status.active_run.is_none() {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    /// Wait until `n` more posts have been sent
    pub async fn wait_sent(events: &mut mpsc::UnboundedReceiver<DispatchEvent>, n: usize) {
        let mut seen = 0;
        while seen < n {
            match events.recv().await {
                Some(DispatchEvent::Sent { .. }) => seen += 1,
                Some(_) => {}
                None => panic!("event channel closed"),
            }
        }
    }

    pub fn drain(events: &mut mpsc::UnboundedReceiver<DispatchEvent>) -> Vec<DispatchEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }
}

#[cfg(test)]
mod contract_tests {
    use super::harness::blueprint;
    use control::ControllerSettings;
    use dispatcher::DispatchSettings;
    use std::time::Duration;

    #[test]
    fn test_blueprint_feeds_engine_and_controller() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A"]);

        let engine = DispatchSettings::from_blueprint(&bp);
        assert_eq!(engine.media_channel, "media-src");
        assert_eq!(engine.rate_limit_margin, Duration::from_secs(1));
        assert_eq!(engine.transient_cooldown, Duration::from_secs(5));
        assert_eq!(engine.prompt_text, "watch here");

        let control = ControllerSettings::from_blueprint(&bp);
        assert_eq!(control.interval, Duration::from_secs(10));
        assert_eq!(control.start_index, 0);
        assert_eq!(control.start_override, None);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use contracts::{ProgressRecord, ProviderError};
    use control::ControlReply;
    use dispatcher::{DispatchEvent, ProgressStore, RunOutcome};
    use tokio::time::Instant;

    use super::harness::*;

    /// Stop mid-batch, restart the process, continue with the persisted caption cursor
    #[tokio::test(start_paused = true)]
    async fn test_restart_continues_caption_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A", "B", "C", "D", "E"]);
        let provider = seeded_provider(5);

        let mut first = spawn(&bp, &provider);
        first.handle.execute("/on").await.unwrap();
        wait_sent(&mut first.events, 2).await;
        first.handle.execute("/off").await.unwrap();
        first.controller.shutdown().await;

        let persisted = ProgressStore::new(progress_path(dir.path())).load();
        assert_eq!(persisted, ProgressRecord::new(1, 2));

        // restart with a fresh controller over the same progress file
        let second = spawn(&bp, &provider);
        let status = second.handle.status().await.unwrap();
        assert_eq!(status.start_index, 2);
        assert_eq!(status.caption_index, 2);

        second.handle.execute("on").await.unwrap();
        let status = wait_idle(&second.handle).await;
        assert_eq!(status.last_outcome, Some(RunOutcome::Completed));
        second.controller.shutdown().await;

        let sent = provider.sent();
        assert_eq!(sent.len(), 5);
        let names: Vec<_> = sent
            .iter()
            .map(|post| post.caption.lines().next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, ["A", "B", "C", "D", "E"]);
        assert_eq!(
            sent.iter().map(|post| post.media.message_id).collect::<Vec<_>>(),
            [1, 2, 3, 4, 5]
        );
        assert_eq!(
            ProgressStore::new(progress_path(dir.path())).load(),
            ProgressRecord::new(4, 0)
        );
    }

    /// Failed items leave the caption cursor untouched
    #[tokio::test(start_paused = true)]
    async fn test_caption_cursor_counts_successful_sends() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A", "B", "C", "D"]);
        let provider = seeded_provider(4);
        // second item fails for good; cursor must not move for it
        provider.script_send_failures(2, [ProviderError::connection("reset")]);

        let running = spawn(&bp, &provider);
        running.handle.start(None).await.unwrap();
        let status = wait_idle(&running.handle).await;
        running.controller.shutdown().await;

        let sent = provider.sent();
        assert_eq!(sent.len(), 3);
        // successful sends mod caption count
        assert_eq!(status.progress, ProgressRecord::new(3, 3));
        assert!(sent[1].caption.starts_with("B\n"));
        assert_eq!(sent[1].media.message_id, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_and_retries_same_item() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A"]);
        let provider = seeded_provider(1);
        provider.script_send_failures(1, [ProviderError::rate_limited(3)]);

        let mut running = spawn(&bp, &provider);
        let started = Instant::now();
        running.handle.start(None).await.unwrap();
        let status = wait_idle(&running.handle).await;
        let elapsed = started.elapsed();
        running.controller.shutdown().await;

        assert!(elapsed >= Duration::from_secs(4), "waited {elapsed:?}");
        assert_eq!(provider.send_attempts(), 2);
        assert_eq!(provider.sent().len(), 1);
        assert_eq!(status.progress, ProgressRecord::new(0, 0));

        let events = drain(&mut running.events);
        assert!(events
            .iter()
            .any(|e| matches!(e, DispatchEvent::RateLimited { index: 0, .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, DispatchEvent::Skipped { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reference_refreshed_once() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A", "B"]);
        let provider = seeded_provider(2);
        // item 0 recovers after one refresh, item 1 stays stale
        provider.script_send_failures(1, [ProviderError::stale("expired")]);
        provider.script_send_failures(
            2,
            [ProviderError::stale("expired"), ProviderError::stale("expired")],
        );

        let mut running = spawn(&bp, &provider);
        running.handle.start(None).await.unwrap();
        let status = wait_idle(&running.handle).await;
        running.controller.shutdown().await;

        assert_eq!(provider.refresh_count(), 2);
        assert_eq!(provider.sent().len(), 1);
        assert_eq!(status.progress, ProgressRecord::new(0, 1));

        let events = drain(&mut running.events);
        assert!(events.iter().any(|e| matches!(
            e,
            DispatchEvent::Skipped { index: 1, .. }
        )));
        assert!(matches!(
            events.last(),
            Some(DispatchEvent::Finished {
                outcome: RunOutcome::Completed,
                sent: 1,
                skipped: 1,
                ..
            })
        ));
    }

    /// Arbitrary on/off/start sequences never overlap runs
    #[tokio::test(start_paused = true)]
    async fn test_no_concurrent_runs() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A", "B", "C"]);
        let provider = seeded_provider(6);

        let mut running = spawn(&bp, &provider);
        let script = [
            "on", "on", "off", "on", "off", "off", "start 2", "on", "start v/4", "off", "on",
        ];
        let mut started = 0;
        for command in script {
            let reply = running.handle.execute(command).await.unwrap();
            if matches!(reply, ControlReply::Started { .. }) {
                started += 1;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        wait_idle(&running.handle).await;
        running.controller.shutdown().await;

        let mut open: Option<u64> = None;
        let mut finished = 0;
        for event in drain(&mut running.events) {
            match event {
                DispatchEvent::Started { run_id, .. } => {
                    assert_eq!(open, None, "run {run_id} started while another was active");
                    open = Some(run_id);
                }
                DispatchEvent::Finished { run_id, .. } => {
                    assert_eq!(open, Some(run_id));
                    open = None;
                    finished += 1;
                }
                _ => {}
            }
        }
        assert!(started >= 1);
        assert_eq!(finished, started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_to_next_wait() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A", "B", "C"]);
        let provider = seeded_provider(3);

        let mut running = spawn(&bp, &provider);
        assert!(matches!(
            running.handle.execute("setting 0").await.unwrap(),
            ControlReply::IntervalRejected(_)
        ));
        assert_eq!(
            running.handle.execute("setting 2.5").await.unwrap(),
            ControlReply::IntervalSet(Duration::from_secs_f64(2.5))
        );

        let started = Instant::now();
        running.handle.start(None).await.unwrap();
        wait_idle(&running.handle).await;
        let elapsed = started.elapsed();
        running.controller.shutdown().await;

        // two pacing waits between three items
        assert!(elapsed >= Duration::from_secs(5), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(10), "waited {elapsed:?}");
        let sent_events = drain(&mut running.events)
            .into_iter()
            .filter(|e| matches!(e, DispatchEvent::Sent { .. }))
            .count();
        assert_eq!(sent_events, 3);
        assert_eq!(provider.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_by_link() {
        let dir = tempfile::tempdir().unwrap();
        let bp = blueprint(dir.path(), &["A", "B", "C"]);
        let provider = seeded_provider(3);

        let running = spawn(&bp, &provider);
        assert_eq!(
            running.handle.execute("start nothing-like-this").await.unwrap(),
            ControlReply::NotFound("nothing-like-this".to_string())
        );
        assert_eq!(
            running.handle.execute("start example.com/v/3").await.unwrap(),
            ControlReply::Started {
                run_id: 1,
                start_index: 2
            }
        );
        wait_idle(&running.handle).await;
        running.controller.shutdown().await;

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].media.message_id, 3);
        assert!(sent[0].caption.ends_with("https://example.com/v/3"));
    }
}

#[cfg(test)]
mod replay_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::MessagingProvider;
    use control::{Controller, ControllerSettings};
    use dispatcher::{DispatchEngine, DispatchSettings};
    use provider::AnyProvider;
    use tokio::sync::mpsc;

    use super::harness::wait_idle;

    /// Config file to outbox through the replay provider
    #[tokio::test(start_paused = true)]
    async fn test_replay_forwarding_writes_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("export");
        std::fs::create_dir_all(export.join("media")).unwrap();
        std::fs::write(
            export.join("media-src.jsonl"),
            concat!(
                r#"{"id": 1, "media": {"message_id": 1, "kind": "photo", "file_id": "p1"}}"#,
                "\n",
                r#"{"id": 2, "text": "no media here"}"#,
                "\n",
                r#"{"id": 3, "media": {"message_id": 3, "kind": "video", "file_id": "v3"}}"#,
                "\n"
            ),
        )
        .unwrap();
        std::fs::write(
            export.join("link-src.jsonl"),
            concat!(
                r#"{"id": 10, "text": "one http://a/1"}"#,
                "\n",
                r#"{"id": 11, "text": "two www.b.org/2"}"#,
                "\n"
            ),
        )
        .unwrap();
        std::fs::write(export.join("media").join("p1"), b"jpeg").unwrap();
        std::fs::write(export.join("media").join("v3"), b"mp4").unwrap();
        std::fs::write(dir.path().join("captions.txt"), "Alice\n\nBob\nCarol\n").unwrap();

        let toml = format!(
            r#"
[channels]
media = "media-src"
links = "link-src"
destination = "target"

[captions]
path = "{captions}"

[progress]
path = "{progress}"

[pacing]
interval_secs = 1.0

[post]
transfer = "reupload"
link_button = "Open"

[provider]
kind = "replay"
params = {{ export_dir = "{export}" }}
"#,
            captions = dir.path().join("captions.txt").display(),
            progress = dir.path().join("progress.json").display(),
            export = export.display(),
        );
        let bp = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let provider = AnyProvider::from_config(&bp.provider, &bp.channels).unwrap();
        assert_eq!(provider.name(), "replay");
        let engine = Arc::new(DispatchEngine::new(
            Arc::new(provider),
            DispatchSettings::from_blueprint(&bp),
        ));
        let (events_tx, _events) = mpsc::unbounded_channel();
        let controller =
            Controller::spawn(engine, ControllerSettings::from_blueprint(&bp), events_tx).unwrap();
        let handle = controller.handle();

        handle.execute("on").await.unwrap();
        let status = wait_idle(&handle).await;
        controller.shutdown().await;

        let outbox =
            std::fs::read_to_string(export.join("outbox").join("target.jsonl")).unwrap();
        let lines: Vec<serde_json::Value> = outbox
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        // two links cap the batch; media message 2 carries no media and is skipped
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message_id"], 1);
        assert_eq!(lines[0]["staged_bytes"], 4);
        assert_eq!(lines[0]["buttons"][0]["url"], "http://a/1");
        assert_eq!(status.progress.caption_index, 1);
    }
}
