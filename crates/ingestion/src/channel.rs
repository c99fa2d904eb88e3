//! Source channel reader
//!
//! Providers enumerate history newest-first; everything downstream works on
//! oldest-first sequences, so the order is flipped here and only here.

use contracts::{MessagingProvider, SourceMessage};
use tracing::{info, instrument};

use crate::error::{IngestionError, Result};

/// Enumerate a channel, oldest message first
#[instrument(name = "channel_read", skip(provider), fields(provider = provider.name()))]
pub async fn read_channel<P>(provider: &P, channel: &str) -> Result<Vec<SourceMessage>>
where
    P: MessagingProvider + Sync,
{
    let mut messages =
        provider
            .history(channel)
            .await
            .map_err(|source| IngestionError::ChannelHistory {
                channel: channel.to_string(),
                source,
            })?;
    messages.reverse();
    Ok(messages)
}

/// Both source channels of a run, oldest first
#[derive(Debug, Clone, Default)]
pub struct SourceChannels {
    /// Media source messages
    pub media: Vec<SourceMessage>,
    /// Link source messages
    pub links: Vec<SourceMessage>,
}

impl SourceChannels {
    /// Enumerate the media and link channels
    pub async fn fetch<P>(provider: &P, media_channel: &str, links_channel: &str) -> Result<Self>
    where
        P: MessagingProvider + Sync,
    {
        let media = read_channel(provider, media_channel).await?;
        let links = read_channel(provider, links_channel).await?;
        info!(
            media_channel = %media_channel,
            links_channel = %links_channel,
            media = media.len(),
            links = links.len(),
            "Source channels enumerated"
        );
        Ok(Self { media, links })
    }
}
