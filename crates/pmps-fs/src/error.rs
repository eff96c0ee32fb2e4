//! Error types for pmps-fs

use std::path::PathBuf;

/// Result type for pmps-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pmps-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The byte stream ended early or failed mid-read.
    #[error("Incomplete read after {received} bytes{}: {message}", expected_suffix(.expected))]
    IncompleteRead {
        received: u64,
        expected: Option<u64>,
        message: String,
    },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Invalid digest: {value}")]
    InvalidDigest { value: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn expected_suffix(expected: &Option<u64>) -> String {
    match expected {
        Some(n) => format!(" (expected {n})"),
        None => String::new(),
    }
}
