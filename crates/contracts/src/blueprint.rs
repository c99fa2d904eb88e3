//! ForwarderBlueprint - Config Loader output
//!
//! Describes a complete forwarder: source channels, caption list, progress
//! file, pacing, post layout, provider selection, control surface.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete forwarder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwarderBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Source and destination channels
    pub channels: ChannelsConfig,

    /// Caption list file
    #[serde(default)]
    pub captions: CaptionsConfig,

    /// Progress file
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Pacing and backoff
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Post layout
    #[serde(default)]
    pub post: PostConfig,

    /// Provider selection
    pub provider: ProviderConfig,

    /// Command surface
    #[serde(default)]
    pub control: ControlConfig,
}

/// Channel identifiers as understood by the provider
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChannelsConfig {
    /// Channel holding the media posts
    #[validate(length(min = 1))]
    pub media: String,

    /// Channel holding the link posts
    #[validate(length(min = 1))]
    pub links: String,

    /// Destination channel
    #[validate(length(min = 1))]
    pub destination: String,
}

/// Caption list location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsConfig {
    /// Plain-text file, one caption per line
    #[serde(default = "default_captions_path")]
    pub path: PathBuf,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            path: default_captions_path(),
        }
    }
}

fn default_captions_path() -> PathBuf {
    PathBuf::from("captions.txt")
}

/// Progress file location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// JSON record rewritten after every successful send
    #[serde(default = "default_progress_path")]
    pub path: PathBuf,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            path: default_progress_path(),
        }
    }
}

fn default_progress_path() -> PathBuf {
    PathBuf::from("progress.json")
}

/// Pacing between sends and failure backoff (seconds)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PacingConfig {
    /// Wait after each successful send
    #[serde(default = "default_interval_secs")]
    #[validate(range(exclusive_min = 0.0))]
    pub interval_secs: f64,

    /// Added on top of the provider-mandated rate-limit wait
    #[serde(default = "default_rate_limit_margin_secs")]
    #[validate(range(min = 0.0))]
    pub rate_limit_margin_secs: f64,

    /// Wait after a transient failure before moving on
    #[serde(default = "default_transient_cooldown_secs")]
    #[validate(range(min = 0.0))]
    pub transient_cooldown_secs: f64,

    /// Start offset used when no progress has been persisted
    #[serde(default)]
    pub start_index: usize,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            rate_limit_margin_secs: default_rate_limit_margin_secs(),
            transient_cooldown_secs: default_transient_cooldown_secs(),
            start_index: 0,
        }
    }
}

impl PacingConfig {
    /// Interval between successful sends
    pub fn interval(&self) -> Duration {
        secs_to_duration(self.interval_secs)
    }

    /// Rate-limit safety margin
    pub fn rate_limit_margin(&self) -> Duration {
        secs_to_duration(self.rate_limit_margin_secs)
    }

    /// Cooldown after a transient failure
    pub fn transient_cooldown(&self) -> Duration {
        secs_to_duration(self.transient_cooldown_secs)
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

fn default_interval_secs() -> f64 {
    1800.0
}

fn default_rate_limit_margin_secs() -> f64 {
    5.0
}

fn default_transient_cooldown_secs() -> f64 {
    10.0
}

/// How media reaches the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Send the provider reference directly
    #[default]
    Forward,
    /// Download to local staging, then upload
    Reupload,
}

/// Post layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostConfig {
    /// Fixed line between the caption name and the link
    #[serde(default = "default_prompt_text")]
    pub prompt_text: String,

    /// Media transfer mode
    #[serde(default)]
    pub transfer: TransferMode,

    /// Label of an inline button pointing at the link (None = no button)
    #[serde(default)]
    pub link_button: Option<String>,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            prompt_text: default_prompt_text(),
            transfer: TransferMode::default(),
            link_button: None,
        }
    }
}

fn default_prompt_text() -> String {
    "watch here".to_string()
}

/// Provider kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// In-memory provider with empty channels (smoke runs)
    Mock,
    /// Channel exports on disk, posts appended to an outbox directory
    Replay,
}

/// Provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider kind
    pub kind: ProviderKind,

    /// Provider-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Command surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Capacity of the command queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    32
}
