//! Error types for the Sanctum core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Sanctum operations.
pub type SanctumResult<T> = Result<T, SanctumError>;

/// Errors that can occur while reading or writing the Sanctum tree.
#[derive(Error, Debug)]
pub enum SanctumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("file not found: {0}")]
    MissingFile(PathBuf),

    #[error("directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid name: {0:?}")]
    InvalidName(String),

    #[error("path is outside the sandbox: {0}")]
    OutsideSandbox(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("seeds not found under {0}; run `sanctum init` first")]
    NotSeeded(PathBuf),
}
