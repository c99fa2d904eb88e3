//! `locate` command implementation.

use anyhow::{Context, Result};
use aligner::LinkLocator;
use ingestion::{extract_link, read_channel};
use provider::AnyProvider;
use tracing::info;

use super::load_blueprint;
use crate::cli::LocateArgs;
use crate::error::CliError;

/// Execute the `locate` command
pub async fn run_locate(args: &LocateArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let provider = AnyProvider::from_config(&blueprint.provider, &blueprint.channels)
        .map_err(CliError::from)?;
    let links = read_channel(&provider, &blueprint.channels.links)
        .await
        .with_context(|| format!("Failed to read {}", blueprint.channels.links))?;

    info!(needle = %args.needle, links = links.len(), "Searching link channel");

    match LinkLocator::locate(&links, &args.needle) {
        Some(index) => {
            let link = links[index]
                .text
                .as_deref()
                .and_then(extract_link)
                .unwrap_or_default();
            println!("{index}\t{link}");
            Ok(())
        }
        None => anyhow::bail!("No link containing '{}'", args.needle),
    }
}
