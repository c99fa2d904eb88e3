//! Mock messaging provider
//!
//! In-memory implementation for tests, supports injecting failure scenarios.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    LinkButton, MediaRef, MessageId, MessagingProvider, OutgoingPost, PostMedia, ProviderError,
    SourceMessage, StagedMedia,
};
use tracing::instrument;

/// Mock provider configuration
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Simulated latency of every send
    pub send_latency: Duration,
}

/// Post recorded by the mock on successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPost {
    pub destination: String,
    pub media: MediaRef,
    pub staged: bool,
    pub caption: String,
    pub buttons: Vec<LinkButton>,
}

/// Mock messaging provider
pub struct MockProvider {
    /// Configuration
    config: MockConfig,
    /// Channel contents, oldest first
    channels: Mutex<HashMap<String, Vec<SourceMessage>>>,
    /// Errors returned by upcoming sends, keyed by media message id
    send_script: Mutex<HashMap<MessageId, VecDeque<ProviderError>>>,
    /// Channels whose history enumeration fails
    history_failures: Mutex<HashMap<String, ProviderError>>,
    /// Media message ids that cannot be refreshed
    refresh_failures: Mutex<HashSet<MessageId>>,
    /// Delivered posts
    sent: Mutex<Vec<SentPost>>,
    send_attempts: AtomicUsize,
    refresh_count: AtomicUsize,
    download_count: AtomicUsize,
}

impl MockProvider {
    /// Create a mock provider with no channels
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a mock provider with configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            channels: Mutex::new(HashMap::new()),
            send_script: Mutex::new(HashMap::new()),
            history_failures: Mutex::new(HashMap::new()),
            refresh_failures: Mutex::new(HashSet::new()),
            sent: Mutex::new(Vec::new()),
            send_attempts: AtomicUsize::new(0),
            refresh_count: AtomicUsize::new(0),
            download_count: AtomicUsize::new(0),
        }
    }

    /// Replace a channel's contents (oldest first)
    pub fn set_channel(&self, channel: impl Into<String>, messages: Vec<SourceMessage>) {
        self.channels
            .lock()
            .unwrap()
            .insert(channel.into(), messages);
    }

    /// Builder form of `set_channel`
    pub fn with_channel(self, channel: impl Into<String>, messages: Vec<SourceMessage>) -> Self {
        self.set_channel(channel, messages);
        self
    }

    /// Queue errors for the next sends of a media message
    ///
    /// Each send attempt pops one error; once drained, sends succeed.
    pub fn script_send_failures(
        &self,
        media_message_id: MessageId,
        errors: impl IntoIterator<Item = ProviderError>,
    ) {
        self.send_script
            .lock()
            .unwrap()
            .entry(media_message_id)
            .or_default()
            .extend(errors);
    }

    /// Make history enumeration of a channel fail
    pub fn fail_history(&self, channel: impl Into<String>, error: ProviderError) {
        self.history_failures
            .lock()
            .unwrap()
            .insert(channel.into(), error);
    }

    /// Make refresh of a media message fail
    pub fn fail_refresh(&self, media_message_id: MessageId) {
        self.refresh_failures
            .lock()
            .unwrap()
            .insert(media_message_id);
    }

    /// Delivered posts, in order
    pub fn sent(&self) -> Vec<SentPost> {
        self.sent.lock().unwrap().clone()
    }

    /// Total send attempts, successful or not
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Total refresh calls
    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// Total download calls
    pub fn download_count(&self) -> usize {
        self.download_count.load(Ordering::SeqCst)
    }

    fn next_scripted_error(&self, media_message_id: MessageId) -> Option<ProviderError> {
        self.send_script
            .lock()
            .unwrap()
            .get_mut(&media_message_id)
            .and_then(VecDeque::pop_front)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MessagingProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    #[instrument(name = "mock_provider_history", skip(self), fields(channel = %channel))]
    async fn history(&self, channel: &str) -> Result<Vec<SourceMessage>, ProviderError> {
        if let Some(err) = self.history_failures.lock().unwrap().get(channel) {
            return Err(err.clone());
        }

        let mut messages = self
            .channels
            .lock()
            .unwrap()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        // Provider order: newest first
        messages.reverse();
        Ok(messages)
    }

    #[instrument(
        name = "mock_provider_send_post",
        skip(self, post),
        fields(destination = %destination, message_id = post.media.media_ref().message_id)
    )]
    async fn send_post(&self, destination: &str, post: &OutgoingPost) -> Result<(), ProviderError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);

        if !self.config.send_latency.is_zero() {
            tokio::time::sleep(self.config.send_latency).await;
        }

        let media = post.media.media_ref();
        if let Some(err) = self.next_scripted_error(media.message_id) {
            return Err(err);
        }

        self.sent.lock().unwrap().push(SentPost {
            destination: destination.to_string(),
            media: media.clone(),
            staged: matches!(post.media, PostMedia::Staged(_)),
            caption: post.caption.clone(),
            buttons: post.buttons.clone(),
        });
        Ok(())
    }

    #[instrument(name = "mock_provider_download", skip(self), fields(file_id = %media.file_id))]
    async fn download(&self, media: &MediaRef) -> Result<StagedMedia, ProviderError> {
        self.download_count.fetch_add(1, Ordering::SeqCst);
        Ok(StagedMedia {
            source: media.clone(),
            file_name: format!("{}.bin", media.file_id),
            data: Bytes::from(media.file_id.clone().into_bytes()),
        })
    }

    #[instrument(
        name = "mock_provider_refresh",
        skip(self, media),
        fields(channel = %channel, message_id = media.message_id)
    )]
    async fn refresh(&self, channel: &str, media: &MediaRef) -> Result<MediaRef, ProviderError> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);

        if self.refresh_failures.lock().unwrap().contains(&media.message_id) {
            return Err(ProviderError::stale(format!(
                "message {} no longer resolvable",
                media.message_id
            )));
        }

        self.channels
            .lock()
            .unwrap()
            .get(channel)
            .and_then(|messages| messages.iter().find(|m| m.id == media.message_id))
            .and_then(|m| m.media.clone())
            .ok_or_else(|| {
                ProviderError::stale(format!("message {} not found in {channel}", media.message_id))
            })
    }
}
