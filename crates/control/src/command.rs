//! Text command surface
//!
//! `on`, `off`, `status`, `setting <seconds>`, `start <index|link-substring>`
//! and `help`, with an optional leading `/`. Keywords are case-insensitive;
//! link substrings are matched as typed.

use thiserror::Error;

/// Usage line listing every command
pub const USAGE: &str = "commands: on | off | status | setting <seconds> | start <index|link> | help";

/// Where a `start` command begins
#[derive(Debug, Clone, PartialEq)]
pub enum StartTarget {
    /// Aligned index
    Index(usize),
    /// First link containing this substring
    Link(String),
}

/// Parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    On,
    Off,
    Status,
    Setting(f64),
    Start(StartTarget),
    Help,
}

/// Command parse failure; its message is the reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command; {usage}", usage = USAGE)]
    Empty,

    #[error("unknown command '{0}'; {usage}", usage = USAGE)]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl std::str::FromStr for Command {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let input = input.strip_prefix('/').unwrap_or(input);
        let (keyword, rest) = match input.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (input, ""),
        };

        match keyword.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "status" => Ok(Self::Status),
            "help" => Ok(Self::Help),
            "setting" => rest
                .parse::<f64>()
                .map(Self::Setting)
                .map_err(|_| CommandError::Usage("setting <seconds>")),
            "start" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("start <index|link>"));
                }
                let target = match rest.parse::<usize>() {
                    Ok(index) => StartTarget::Index(index),
                    Err(_) => StartTarget::Link(rest.to_string()),
                };
                Ok(Self::Start(target))
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
