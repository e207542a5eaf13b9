//! Typed error hierarchy for the research dashboard.
//!
//! One enum per subsystem:
//! - `PathError`: rejected user-supplied paths
//! - `FileError`: corpus listing, upload, deletion and content I/O
//! - `AgentError`: provider resolution and agent process failures
//! - `ConfigError`: invalid `research-writer.toml` values
//!
//! The HTTP layer (`dashboard::api::ApiError`) maps each variant to a status code.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a relative path is refused by the validator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Path required")]
    Empty,

    #[error("Path too long ({len} > {max} bytes)")]
    TooLong { len: usize, max: usize },

    #[error("Path contains invalid characters")]
    InvalidCharacter,

    #[error("Absolute paths are not allowed")]
    Absolute,

    #[error("Path traversal is not allowed")]
    Traversal,

    #[error("Access to '{root}' is not allowed")]
    NotAllowed { root: String },

    #[error("Path must name an entry inside '{dir}'")]
    NoEntry { dir: String },

    #[error("Path resolves outside of its allowed directory")]
    Escapes,
}

/// Errors from file listing, upload, deletion and content access.
#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Invalid directory '{0}'")]
    InvalidDirectory(String),

    #[error("Deleting files from '{0}' is not allowed")]
    DeleteForbidden(String),

    #[error("Invalid filename '{0}'")]
    InvalidFilename(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Cannot read directories: {0}")]
    IsDirectory(String),

    #[error("File too large ({size} bytes, maximum is {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Only PDF files can be uploaded")]
    NotPdf,

    #[error("File is not valid UTF-8 text: {0}")]
    NotText(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from provider resolution and agent process handling.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid provider '{0}'. Must be 'gemini' or 'claude'")]
    InvalidProvider(String),

    #[error("{provider} CLI is not installed or not in your PATH (looked for '{command}')")]
    NotInstalled { provider: String, command: String },

    #[error("Failed to spawn {command}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for agent process: {0}")]
    WaitFailed(#[source] std::io::Error),

    #[error(transparent)]
    File(#[from] FileError),
}

/// Invalid configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Unknown default provider '{0}'")]
    UnknownProvider(String),

    #[error("Invalid host '{0}'")]
    InvalidHost(String),
}
