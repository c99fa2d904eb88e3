//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// postrelay - resumable batch forwarder
#[derive(Parser, Debug)]
#[command(
    name = "postrelay",
    author,
    version,
    about = "Resumable batch forwarder for messaging channels",
    long_about = "Pairs media posts, link posts and captions into composite posts and \n\
                  forwards them one by one to a destination channel at a controlled pace.\n\n\
                  Progress is persisted after every successful send, so an interrupted \n\
                  batch resumes where it stopped."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "POSTRELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "POSTRELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the forwarder, reading control commands from stdin
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and persisted progress
    Info(InfoArgs),

    /// Find the batch index of the first link containing a substring
    Locate(LocateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "postrelay.toml",
        env = "POSTRELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the pacing interval in seconds
    #[arg(long, env = "POSTRELAY_INTERVAL")]
    pub interval: Option<f64>,

    /// Start index that wins over persisted progress
    #[arg(long, env = "POSTRELAY_START_INDEX")]
    pub start_index: Option<usize>,

    /// Start a run immediately instead of waiting for `on`
    #[arg(long)]
    pub autostart: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "POSTRELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "postrelay.toml", env = "POSTRELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "postrelay.toml", env = "POSTRELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `locate` command
#[derive(Parser, Debug)]
pub struct LocateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "postrelay.toml", env = "POSTRELAY_CONFIG")]
    pub config: PathBuf,

    /// Substring to search for in the extracted links
    pub needle: String,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
