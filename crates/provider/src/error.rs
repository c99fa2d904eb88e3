//! Provider construction errors

use contracts::ProviderKind;
use thiserror::Error;

/// Error building a provider from configuration
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Required parameter absent
    #[error("provider {kind:?} requires parameter '{key}'")]
    MissingParam { kind: ProviderKind, key: String },

    /// Parameter present but unusable
    #[error("provider {kind:?} parameter '{key}' has invalid value '{value}'")]
    InvalidParam {
        kind: ProviderKind,
        key: String,
        value: String,
    },

    /// Filesystem setup failed
    #[error("provider setup io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderBuildError {
    /// Create missing parameter error
    pub fn missing_param(kind: ProviderKind, key: impl Into<String>) -> Self {
        Self::MissingParam {
            kind,
            key: key.into(),
        }
    }

    /// Create invalid parameter error
    pub fn invalid_param(kind: ProviderKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParam {
            kind,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ProviderBuildError>;
