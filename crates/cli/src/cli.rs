//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Upload Relay - replicate uploads to every configured destination
#[derive(Parser, Debug)]
#[command(
    name = "upload-relay",
    author,
    version,
    about = "Replicate uploads to multiple storage destinations",
    long_about = "Streams each upload once and writes it to every configured destination \n\
                  concurrently, with bounded memory. An upload succeeds only if every \n\
                  destination stored it."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "UPLOAD_RELAY_VERBOSE")]
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
        env = "UPLOAD_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replicate files to every configured destination
    Upload(UploadArgs),

    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `upload` command
#[derive(Parser, Debug, Clone)]
pub struct UploadArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "UPLOAD_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Stored name (single file only, defaults to the file name)
    #[arg(long, env = "UPLOAD_RELAY_NAME")]
    pub name: Option<String>,

    /// Per-upload timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "UPLOAD_RELAY_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "UPLOAD_RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml", env = "UPLOAD_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "UPLOAD_RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show destination parameters
    #[arg(long)]
    pub destinations: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_command() {
        let cli = Cli::try_parse_from([
            "upload-relay",
            "-v",
            "upload",
            "-c",
            "relay.toml",
            "--timeout",
            "5",
            "a.txt",
            "b.txt",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.config, PathBuf::from("relay.toml"));
                assert_eq!(args.timeout, 5);
                assert_eq!(args.files.len(), 2);
                assert!(args.name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Cli::try_parse_from(["upload-relay", "upload", "-c", "relay.toml"]).is_err());
    }
}
