//! MessagingProvider trait - chat provider client interface
//!
//! Defines the abstract boundary to the messaging service. Implementations
//! classify every failure into a `ProviderError` variant before returning.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{MediaRef, ProviderError, SourceMessage};

/// Media downloaded to local staging before upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMedia {
    /// Original handle
    pub source: MediaRef,

    /// File name used for the upload
    pub file_name: String,

    /// Raw content
    pub data: Bytes,
}

/// Media part of an outgoing post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostMedia {
    /// Forward by provider reference
    Reference(MediaRef),
    /// Upload previously staged content
    Staged(StagedMedia),
}

impl PostMedia {
    /// Handle of the underlying media
    pub fn media_ref(&self) -> &MediaRef {
        match self {
            Self::Reference(media) => media,
            Self::Staged(staged) => &staged.source,
        }
    }
}

/// Inline URL button attached below a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// Post sent to the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPost {
    pub media: PostMedia,
    pub caption: String,
    pub buttons: Vec<LinkButton>,
}

/// Messaging provider client
///
/// All implementations must implement this trait.
#[trait_variant::make(MessagingProvider: Send)]
pub trait LocalMessagingProvider {
    /// Provider name (used for logging)
    fn name(&self) -> &str;

    /// Enumerate the full history of a channel
    ///
    /// Messages are returned in the provider's natural order: newest first.
    async fn history(&self, channel: &str) -> Result<Vec<SourceMessage>, ProviderError>;

    /// Send a file with caption and optional buttons to a destination
    async fn send_post(&self, destination: &str, post: &OutgoingPost)
        -> Result<(), ProviderError>;

    /// Download media into local staging
    async fn download(&self, media: &MediaRef) -> Result<StagedMedia, ProviderError>;

    /// Re-resolve an expired media handle from its source channel
    async fn refresh(&self, channel: &str, media: &MediaRef) -> Result<MediaRef, ProviderError>;
}
