//! Error types for CLI operations.

use contracts::ContractError;
use control::ControlError;
use provider::ProviderBuildError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parsing or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// Command-line override out of range
    #[error("Invalid override {flag}: {message}")]
    InvalidOverride { flag: &'static str, message: String },

    /// Provider could not be built
    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderBuildError),

    /// Controller could not start or went away
    #[error("Controller error: {0}")]
    Control(#[from] ControlError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_override(flag: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            flag,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
