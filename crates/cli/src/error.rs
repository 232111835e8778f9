//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid combination of arguments
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Upload exceeds `max_file_size`
    #[error("File too large: {} is {size} bytes, limit is {limit}", .path.display())]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    /// Upload did not finish in time
    #[error("Upload '{name}' timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    /// At least one branch of the upload failed; details are logged
    #[error("failed to store upload '{name}'")]
    StoreFailed {
        name: String,
        source_failed: bool,
        destinations: Vec<String>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
