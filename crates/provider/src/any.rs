//! Provider selection
//!
//! `MessagingProvider` is not object safe (async methods), so the configured
//! provider is an enum that delegates to the selected implementation.

use std::time::Duration;

use contracts::{
    ChannelsConfig, MediaKind, MediaRef, MessagingProvider, OutgoingPost, ProviderConfig,
    ProviderError, ProviderKind, SourceMessage, StagedMedia,
};
use tracing::info;

use crate::error::{ProviderBuildError, Result};
use crate::mock::{MockConfig, MockProvider};
use crate::replay::ReplayProvider;

/// Configured provider
pub enum AnyProvider {
    Mock(MockProvider),
    Replay(ReplayProvider),
}

impl AnyProvider {
    /// Build the provider selected by configuration
    ///
    /// Mock params:
    /// - `send_latency_ms`: simulated latency of every send
    /// - `seed_posts`: number of synthetic media/link pairs placed in the source channels
    pub fn from_config(config: &ProviderConfig, channels: &ChannelsConfig) -> Result<Self> {
        let provider = match config.kind {
            ProviderKind::Mock => {
                let send_latency_ms = parse_param(config, "send_latency_ms")?.unwrap_or(0);
                let seed_posts = parse_param(config, "seed_posts")?.unwrap_or(0);

                let mock = MockProvider::with_config(MockConfig {
                    send_latency: Duration::from_millis(send_latency_ms),
                });
                if seed_posts > 0 {
                    let (media, links) = synthetic_channels(seed_posts);
                    mock.set_channel(channels.media.clone(), media);
                    mock.set_channel(channels.links.clone(), links);
                }
                Self::Mock(mock)
            }
            ProviderKind::Replay => Self::Replay(ReplayProvider::from_params(&config.params)?),
        };

        info!(provider = provider.name(), "Provider created");
        Ok(provider)
    }
}

fn parse_param(config: &ProviderConfig, key: &str) -> Result<Option<u64>> {
    config
        .params
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| ProviderBuildError::invalid_param(config.kind, key, raw))
        })
        .transpose()
}

/// `count` media messages and `count` link messages, oldest first
fn synthetic_channels(count: u64) -> (Vec<SourceMessage>, Vec<SourceMessage>) {
    let media = (1..=count as i64)
        .map(|id| SourceMessage {
            id,
            media: Some(MediaRef {
                message_id: id,
                kind: MediaKind::Video,
                file_id: format!("mock-file-{id}"),
            }),
            text: None,
        })
        .collect();
    let links = (1..=count as i64)
        .map(|id| SourceMessage::text(id, format!("episode {id} https://example.com/watch/{id}")))
        .collect();
    (media, links)
}

impl MessagingProvider for AnyProvider {
    fn name(&self) -> &str {
        match self {
            Self::Mock(p) => p.name(),
            Self::Replay(p) => p.name(),
        }
    }

    async fn history(&self, channel: &str) -> std::result::Result<Vec<SourceMessage>, ProviderError> {
        match self {
            Self::Mock(p) => p.history(channel).await,
            Self::Replay(p) => p.history(channel).await,
        }
    }

    async fn send_post(
        &self,
        destination: &str,
        post: &OutgoingPost,
    ) -> std::result::Result<(), ProviderError> {
        match self {
            Self::Mock(p) => p.send_post(destination, post).await,
            Self::Replay(p) => p.send_post(destination, post).await,
        }
    }

    async fn download(&self, media: &MediaRef) -> std::result::Result<StagedMedia, ProviderError> {
        match self {
            Self::Mock(p) => p.download(media).await,
            Self::Replay(p) => p.download(media).await,
        }
    }

    async fn refresh(
        &self,
        channel: &str,
        media: &MediaRef,
    ) -> std::result::Result<MediaRef, ProviderError> {
        match self {
            Self::Mock(p) => p.refresh(channel, media).await,
            Self::Replay(p) => p.refresh(channel, media).await,
        }
    }
}
