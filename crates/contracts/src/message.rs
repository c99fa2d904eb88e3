//! SourceMessage - Provider history item
//!
//! One message enumerated from a source channel.

use serde::{Deserialize, Serialize};

/// Provider-assigned message identifier
pub type MessageId = i64;

/// Media kind carried by a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

/// Opaque media handle
///
/// Valid for a limited time on most providers; a stale handle is
/// re-resolved through `MessagingProvider::refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Message the media is attached to
    pub message_id: MessageId,

    /// Media kind
    pub kind: MediaKind,

    /// Provider file handle
    pub file_id: String,
}

/// Message enumerated from a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMessage {
    /// Message identifier (monotonic within a channel)
    pub id: MessageId,

    /// Attached media, if any
    #[serde(default)]
    pub media: Option<MediaRef>,

    /// Free text, if any
    #[serde(default)]
    pub text: Option<String>,
}

impl SourceMessage {
    /// Create a text-only message
    pub fn text(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            media: None,
            text: Some(text.into()),
        }
    }

    /// Create a media-only message
    pub fn media(id: MessageId, kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            id,
            media: Some(MediaRef {
                message_id: id,
                kind,
                file_id: file_id.into(),
            }),
            text: None,
        }
    }

    /// Create a message carrying neither media nor text
    pub fn empty(id: MessageId) -> Self {
        Self {
            id,
            media: None,
            text: None,
        }
    }
}
