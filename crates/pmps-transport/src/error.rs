//! Error types for pmps-transport

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a transport session can report
///
/// Every variant names the host so errors can be attached to per-host
/// reports without extra context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Connection, authentication or session failure
    #[error("Host {host} unreachable: {message}")]
    HostUnreachable { host: String, message: String },

    /// The remote directory does not exist
    #[error("Remote path not found on {host}: {path}")]
    PathNotFound { host: String, path: String },

    /// Content could not be fetched in full
    #[error("Incomplete read of {name} from {host}: {message}")]
    IncompleteRead {
        host: String,
        name: String,
        message: String,
    },

    /// Upload, confirmation or rename failed
    #[error("Write of {name} to {host} failed: {message}")]
    WriteFailed {
        host: String,
        name: String,
        message: String,
    },
}

impl Error {
    pub fn unreachable(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostUnreachable {
            host: host.into(),
            message: message.into(),
        }
    }

    pub fn incomplete(host: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IncompleteRead {
            host: host.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn write_failed(host: impl Into<String>, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            host: host.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the session itself is gone, as opposed to one file failing.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::HostUnreachable { .. })
    }
}
