//! Error types for pmps-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end a command before it could produce a report
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from pmps-core
    #[error(transparent)]
    Core(#[from] pmps_core::Error),

    /// Error from pmps-transport, outside of a run
    #[error(transparent)]
    Transport(#[from] pmps_transport::Error),

    /// Error from pmps-fs
    #[error(transparent)]
    Fs(#[from] pmps_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
