//! Error types for pmps-core
//!
//! Only failures that stop a run from starting surface here. Everything that
//! goes wrong for one host or one file is captured as an
//! [`ErrorRecord`](crate::ErrorRecord) inside the report instead.

use std::path::PathBuf;

/// Result type for pmps-core operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The local source-of-truth directory is missing or unreadable
    #[error("Source directory {path} unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Configuration file not found at an explicitly requested path
    #[error("Configuration not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// A configuration value failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Filesystem error from pmps-fs
    #[error(transparent)]
    Fs(#[from] pmps_fs::Error),

    /// Transport error from pmps-transport
    #[error(transparent)]
    Transport(#[from] pmps_transport::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
