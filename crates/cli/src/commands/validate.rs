//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ForwarderBlueprint, ProviderKind, TransferMode};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::load_blueprint;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    media: String,
    links: String,
    destination: String,
    provider: String,
    interval_secs: f64,
    transfer: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(&args.config);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    match load_blueprint(path) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    media: blueprint.channels.media.clone(),
                    links: blueprint.channels.links.clone(),
                    destination: blueprint.channels.destination.clone(),
                    provider: format!("{:?}", blueprint.provider.kind),
                    interval_secs: blueprint.pacing.interval_secs,
                    transfer: format!("{:?}", blueprint.post.transfer),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &ForwarderBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if !blueprint.captions.path.exists() {
        warnings.push(format!(
            "Caption file {} not found - runs will have nothing to send",
            blueprint.captions.path.display()
        ));
    }

    if blueprint.provider.kind == ProviderKind::Mock
        && !blueprint.provider.params.contains_key("seed_posts")
    {
        warnings.push("Mock provider without seed_posts - source channels are empty".to_string());
    }

    if blueprint.post.transfer == TransferMode::Reupload && blueprint.provider.kind == ProviderKind::Mock
    {
        warnings.push("Reupload with the mock provider stages placeholder bytes only".to_string());
    }

    if blueprint.pacing.interval_secs < 1.0 {
        warnings.push(format!(
            "pacing.interval_secs = {} is likely to trigger provider rate limits",
            blueprint.pacing.interval_secs
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Media channel: {}", summary.media);
            println!("  Link channel: {}", summary.links);
            println!("  Destination: {}", summary.destination);
            println!("  Provider: {}", summary.provider);
            println!("  Interval: {}s", summary.interval_secs);
            println!("  Transfer: {}", summary.transfer);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
