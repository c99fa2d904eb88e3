//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ForwarderBlueprint, ProgressRecord};
use dispatcher::ProgressStore;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    channels: ChannelsInfo,
    captions: CaptionsInfo,
    progress: ProgressInfo,
    pacing: PacingInfo,
    post: PostInfo,
    provider: String,
}

#[derive(Serialize)]
struct ChannelsInfo {
    media: String,
    links: String,
    destination: String,
}

#[derive(Serialize)]
struct CaptionsInfo {
    path: String,
    /// None when the file cannot be read
    count: Option<usize>,
}

#[derive(Serialize)]
struct ProgressInfo {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<ProgressRecord>,
    next_index: usize,
}

#[derive(Serialize)]
struct PacingInfo {
    interval_secs: f64,
    rate_limit_margin_secs: f64,
    transient_cooldown_secs: f64,
}

#[derive(Serialize)]
struct PostInfo {
    prompt_text: String,
    transfer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_button: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let record = ProgressStore::new(&blueprint.progress.path)
        .load_existing()
        .context("Failed to read progress file")?;
    let info = build_config_info(&blueprint, record);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &ForwarderBlueprint, record: Option<ProgressRecord>) -> ConfigInfo {
    let caption_count = std::fs::read_to_string(&blueprint.captions.path)
        .ok()
        .map(|content| ingestion::parse_captions(&content).len());

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        channels: ChannelsInfo {
            media: blueprint.channels.media.clone(),
            links: blueprint.channels.links.clone(),
            destination: blueprint.channels.destination.clone(),
        },
        captions: CaptionsInfo {
            path: blueprint.captions.path.display().to_string(),
            count: caption_count,
        },
        progress: ProgressInfo {
            path: blueprint.progress.path.display().to_string(),
            next_index: record
                .map(|r| r.next_index())
                .unwrap_or(blueprint.pacing.start_index),
            record,
        },
        pacing: PacingInfo {
            interval_secs: blueprint.pacing.interval_secs,
            rate_limit_margin_secs: blueprint.pacing.rate_limit_margin_secs,
            transient_cooldown_secs: blueprint.pacing.transient_cooldown_secs,
        },
        post: PostInfo {
            prompt_text: blueprint.post.prompt_text.clone(),
            transfer: format!("{:?}", blueprint.post.transfer),
            link_button: blueprint.post.link_button.clone(),
        },
        provider: format!("{:?}", blueprint.provider.kind),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("postrelay configuration ({})\n", info.version);

    println!("Channels");
    println!("   ├─ Media: {}", info.channels.media);
    println!("   ├─ Links: {}", info.channels.links);
    println!("   └─ Destination: {}", info.channels.destination);

    println!("\nCaptions");
    println!("   ├─ Path: {}", info.captions.path);
    match info.captions.count {
        Some(count) => println!("   └─ Entries: {}", count),
        None => println!("   └─ Entries: (file not readable)"),
    }

    println!("\nProgress");
    println!("   ├─ Path: {}", info.progress.path);
    match &info.progress.record {
        Some(record) => {
            println!("   ├─ Last sent index: {}", record.last_index);
            println!("   ├─ Caption cursor: {}", record.caption_index);
        }
        None => println!("   ├─ Nothing persisted yet"),
    }
    println!("   └─ Next start index: {}", info.progress.next_index);

    println!("\nPacing");
    println!("   ├─ Interval: {}s", info.pacing.interval_secs);
    println!("   ├─ Rate-limit margin: {}s", info.pacing.rate_limit_margin_secs);
    println!(
        "   └─ Transient cooldown: {}s",
        info.pacing.transient_cooldown_secs
    );

    println!("\nPost");
    println!("   ├─ Prompt: {}", info.post.prompt_text);
    println!("   ├─ Transfer: {}", info.post.transfer);
    match &info.post.link_button {
        Some(label) => println!("   └─ Link button: {}", label),
        None => println!("   └─ Link button: (none)"),
    }

    println!("\nProvider: {}", info.provider);
    println!();
}
