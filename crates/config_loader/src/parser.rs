//! Config parsing
//!
//! TOML (primary) and JSON (optional).

use contracts::{ContractError, ForwarderBlueprint};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse config in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<ForwarderBlueprint, ContractError> {
    let parsed: Result<ForwarderBlueprint, Box<dyn std::error::Error + Send + Sync>> =
        match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.into()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.into()),
        };
    parsed.map_err(|source| ContractError::ConfigParse {
        message: format!("{format:?} parse error: {source}"),
        source: Some(source),
    })
}
