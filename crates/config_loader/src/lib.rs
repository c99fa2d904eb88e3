//! # Config Loader
//!
//! Turns a forwarder config file into a checked [`ForwarderBlueprint`].
//!
//! The file format follows the extension (`.toml` or `.json`). Every loaded
//! blueprint passes the same validation as one patched by CLI overrides, so
//! channel names, caption/progress paths, pacing ranges and provider params
//! are known to be usable before the control loop starts.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("postrelay.toml")).unwrap();
//! println!("Destination: {}", blueprint.channels.destination);
//! ```

mod parser;
mod validator;

pub use contracts::ForwarderBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Forwarder config loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a config file
    pub fn load_from_path(path: &Path) -> Result<ForwarderBlueprint, ContractError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ContractError::config_parse("cannot determine file format from extension"))
            .and_then(|ext| {
                ConfigFormat::from_extension(ext).ok_or_else(|| {
                    ContractError::config_parse(format!("unsupported config format: .{ext}"))
                })
            })?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate config content
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ForwarderBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint after CLI overrides were applied
    pub fn validate(blueprint: &ForwarderBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[channels]
media = "media-src"
links = "link-src"
destination = "target"

[pacing]
interval_secs = 60.0

[post]
link_button = "Watch"

[provider]
kind = "replay"
params = { export_dir = "exports" }
"#;

    #[test]
    fn test_load_from_str_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.channels.destination, "target");
        assert_eq!(bp.pacing.interval_secs, 60.0);
        assert_eq!(bp.post.link_button.as_deref(), Some("Watch"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[channels]
media = "same"
links = "same"
destination = "target"

[provider]
kind = "mock"
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_out_of_range_interval_fails_load() {
        let content = MINIMAL_TOML.replace("interval_secs = 60.0", "interval_secs = 1e300");
        let err = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap_err();
        assert!(err.to_string().contains("pacing.interval_secs"));
    }

    #[test]
    fn test_validate_catches_overrides() {
        let mut bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        assert!(ConfigLoader::validate(&bp).is_ok());
        bp.pacing.interval_secs = 1e20;
        assert!(ConfigLoader::validate(&bp).is_err());
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postrelay.toml");
        std::fs::write(&path, MINIMAL_TOML).unwrap();
        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(bp.channels.media, "media-src");

        let json = dir.path().join("postrelay.json");
        std::fs::write(
            &json,
            r#"{
                "channels": { "media": "m", "links": "l", "destination": "d" },
                "provider": { "kind": "mock" }
            }"#,
        )
        .unwrap();
        assert_eq!(ConfigLoader::load_from_path(&json).unwrap().channels.links, "l");

        let bad = dir.path().join("postrelay.yaml");
        std::fs::write(&bad, MINIMAL_TOML).unwrap();
        let err = ConfigLoader::load_from_path(&bad).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));

        let bare = dir.path().join("postrelay");
        std::fs::write(&bare, MINIMAL_TOML).unwrap();
        assert!(ConfigLoader::load_from_path(&bare).is_err());
    }
}
