//! Layered error definitions
//!
//! Categorized by source: config / provider / io

use std::time::Duration;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Provider Errors =====
    /// Error raised by the messaging provider
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Provider failure, classified once at the client edge.
///
/// The dispatch engine reacts to the variant only; it never inspects messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider demands a pause before accepting further requests
    #[error("rate limited: retry after {}s", wait.as_secs_f64())]
    RateLimited { wait: Duration },

    /// A media handle expired and must be re-resolved before reuse
    #[error("stale media reference: {message}")]
    StaleReference { message: String },

    /// Transient connectivity loss
    #[error("provider connection error: {message}")]
    Connection { message: String },

    /// The provider refused this particular request
    #[error("provider rejected request: {message}")]
    Rejected { message: String },

    /// The authenticated session is unusable
    #[error("provider session error: {message}")]
    Session { message: String },
}

impl ProviderError {
    /// Create a rate-limit signal with a wait in whole seconds
    pub fn rate_limited(wait_secs: u64) -> Self {
        Self::RateLimited {
            wait: Duration::from_secs(wait_secs),
        }
    }

    /// Create a stale-reference error
    pub fn stale(message: impl Into<String>) -> Self {
        Self::StaleReference {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    /// Whether the failure is expected to clear by itself
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Connection { .. })
    }
}
