//! Error types for prestage
//!
//! Library errors use `thiserror`; the binary wraps them in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for prestage operations
pub type PrestageResult<T> = Result<T, PrestageError>;

/// Main error type for prestage operations
#[derive(Error, Debug)]
pub enum PrestageError {
    /// Front-end build command exited non-zero or could not be spawned
    #[error("build command `{command}` failed{}", exit_label(.code))]
    BuildFailed { command: String, code: Option<i32> },

    /// Build-output directory does not exist when the copy step runs
    #[error("build output directory not found: {path} - run the front-end build first")]
    BuildOutputMissing { path: PathBuf },

    /// Invalid config TOML
    #[error("invalid config in {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },

    /// Configured path escapes the project root (staging removal is recursive)
    #[error("path '{path}' escapes project root '{root}'")]
    PathEscape { path: PathBuf, root: PathBuf },

    /// `init` refusing to clobber an existing config file
    #[error("config file already exists: {path}")]
    ConfigExists { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit code {c}"),
        None => String::from(" (terminated by signal or not spawnable)"),
    }
}
