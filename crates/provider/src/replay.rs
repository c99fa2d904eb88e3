//! Replay provider - channel exports on disk
//!
//! Reads channel exports (`<export_dir>/<channel>.jsonl`, one `SourceMessage`
//! per line), stages media from `<export_dir>/media/<file_id>`, and appends
//! every delivered post to `<outbox_dir>/<destination>.jsonl`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use contracts::{
    LinkButton, MediaKind, MediaRef, MessageId, MessagingProvider, OutgoingPost, PostMedia,
    ProviderError, ProviderKind, SourceMessage, StagedMedia,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{ProviderBuildError, Result};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Directory holding the channel exports
    pub export_dir: PathBuf,

    /// Directory receiving delivered posts
    pub outbox_dir: PathBuf,
}

impl ReplayConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let export_dir = params
            .get("export_dir")
            .map(PathBuf::from)
            .ok_or_else(|| ProviderBuildError::missing_param(ProviderKind::Replay, "export_dir"))?;

        let outbox_dir = params
            .get("outbox_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| export_dir.join("outbox"));

        Ok(Self {
            export_dir,
            outbox_dir,
        })
    }
}

/// Line appended to the outbox for each delivered post
#[derive(Debug, Serialize)]
struct OutboxRecord<'a> {
    sent_at: String,
    message_id: MessageId,
    kind: MediaKind,
    file_id: &'a str,
    staged_bytes: Option<usize>,
    caption: &'a str,
    buttons: &'a [LinkButton],
}

/// Provider backed by channel exports
pub struct ReplayProvider {
    config: ReplayConfig,
}

impl ReplayProvider {
    /// Create a replay provider, creating the outbox directory if needed
    pub fn new(config: ReplayConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.outbox_dir)?;
        info!(
            export_dir = %config.export_dir.display(),
            outbox_dir = %config.outbox_dir.display(),
            "Replay provider ready"
        );
        Ok(Self { config })
    }

    /// Create from params map (for factory)
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let config = ReplayConfig::from_params(params)?;
        Ok(Self::new(config)?)
    }

    /// Path of a channel export
    pub fn channel_path(&self, channel: &str) -> PathBuf {
        self.config.export_dir.join(format!("{channel}.jsonl"))
    }

    /// Path of a staged media file; the id must be a plain file name
    fn media_path(&self, file_id: &str) -> std::result::Result<PathBuf, ProviderError> {
        let mut components = Path::new(file_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if !file_id.contains('\\') => {
                Ok(self.config.export_dir.join("media").join(name))
            }
            _ => Err(ProviderError::rejected(format!(
                "media file id {file_id:?} is not a plain file name"
            ))),
        }
    }

    /// Path of a destination outbox
    pub fn outbox_path(&self, destination: &str) -> PathBuf {
        self.config.outbox_dir.join(format!("{destination}.jsonl"))
    }

    async fn read_channel(&self, channel: &str) -> std::result::Result<Vec<SourceMessage>, ProviderError> {
        let path = self.channel_path(channel);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| classify_io(&path, e))?;

        let mut messages = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SourceMessage>(line) {
                Ok(message) => messages.push(message),
                Err(e) => warn!(
                    path = %path.display(),
                    line = line_no + 1,
                    error = %e,
                    "Skipping malformed export line"
                ),
            }
        }
        Ok(messages)
    }
}

impl MessagingProvider for ReplayProvider {
    fn name(&self) -> &str {
        "replay"
    }

    #[instrument(name = "replay_provider_history", skip(self), fields(channel = %channel))]
    async fn history(&self, channel: &str) -> std::result::Result<Vec<SourceMessage>, ProviderError> {
        let mut messages = self.read_channel(channel).await?;
        // Provider order: newest first
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        debug!(channel = %channel, messages = messages.len(), "Loaded channel export");
        Ok(messages)
    }

    #[instrument(
        name = "replay_provider_send_post",
        skip(self, post),
        fields(destination = %destination, message_id = post.media.media_ref().message_id)
    )]
    async fn send_post(
        &self,
        destination: &str,
        post: &OutgoingPost,
    ) -> std::result::Result<(), ProviderError> {
        let media = post.media.media_ref();
        let staged_bytes = match &post.media {
            PostMedia::Reference(_) => None,
            PostMedia::Staged(staged) => Some(staged.data.len()),
        };

        let record = OutboxRecord {
            sent_at: Utc::now().to_rfc3339(),
            message_id: media.message_id,
            kind: media.kind,
            file_id: &media.file_id,
            staged_bytes,
            caption: &post.caption,
            buttons: &post.buttons,
        };
        let mut line = serde_json::to_string(&record)
            .map_err(|e| ProviderError::rejected(format!("unserializable post: {e}")))?;
        line.push('\n');

        let path = self.outbox_path(destination);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| ProviderError::connection(format!("{}: {e}", path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ProviderError::connection(format!("{}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| ProviderError::connection(format!("{}: {e}", path.display())))?;

        Ok(())
    }

    #[instrument(name = "replay_provider_download", skip(self), fields(file_id = %media.file_id))]
    async fn download(&self, media: &MediaRef) -> std::result::Result<StagedMedia, ProviderError> {
        let path = self.media_path(&media.file_id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(StagedMedia {
                source: media.clone(),
                file_name: media.file_id.clone(),
                data: Bytes::from(data),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ProviderError::stale(format!(
                "media file {} missing",
                path.display()
            ))),
            Err(e) => Err(ProviderError::connection(format!("{}: {e}", path.display()))),
        }
    }

    #[instrument(
        name = "replay_provider_refresh",
        skip(self, media),
        fields(channel = %channel, message_id = media.message_id)
    )]
    async fn refresh(
        &self,
        channel: &str,
        media: &MediaRef,
    ) -> std::result::Result<MediaRef, ProviderError> {
        self.read_channel(channel)
            .await?
            .into_iter()
            .find(|m| m.id == media.message_id)
            .and_then(|m| m.media)
            .ok_or_else(|| {
                ProviderError::stale(format!(
                    "message {} not found in {channel}",
                    media.message_id
                ))
            })
    }
}

/// Classify a filesystem error reading an export
fn classify_io(path: &Path, err: std::io::Error) -> ProviderError {
    match err.kind() {
        ErrorKind::NotFound => {
            ProviderError::rejected(format!("no export for channel at {}", path.display()))
        }
        ErrorKind::PermissionDenied => {
            ProviderError::session(format!("{}: {err}", path.display()))
        }
        _ => ProviderError::connection(format!("{}: {err}", path.display())),
    }
}
