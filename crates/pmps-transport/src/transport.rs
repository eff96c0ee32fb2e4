//! The transport trait and shared helpers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Suffix of the temporary artifact an atomic write leaves while in flight.
pub const TEMP_SUFFIX: &str = ".pmpsdb-tmp";

/// One regular file in a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// Size from the listing. May be stale; never used as a fingerprint.
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Temporary name used while uploading `name`.
pub fn temp_name(name: &str) -> String {
    format!(".{name}{TEMP_SUFFIX}")
}

/// Whether `name` is a leftover from an interrupted atomic write.
pub fn is_temp_artifact(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Join a remote directory and file name with a single `/`.
pub fn remote_join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// A session to one host's remote file-transfer service.
///
/// Implementations connect lazily on the first operation. `close` must be
/// safe to call whether or not a connection was ever made, and more than
/// once.
#[async_trait]
pub trait Transport: Send {
    /// Hostname used in errors and logs.
    fn host(&self) -> &str;

    /// List the regular files in `dir`.
    async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>>;

    /// Fetch the full content of `dir/name`.
    ///
    /// Short transfers surface as [`Error::IncompleteRead`], never as a
    /// shorter buffer.
    async fn read(&mut self, dir: &str, name: &str) -> Result<Vec<u8>>;

    /// Upload `content` to `dir/name` verbatim and return the byte count the
    /// remote side reports holding afterwards.
    ///
    /// Not atomic. Callers wanting atomic replacement use [`Transport::write`].
    async fn put(&mut self, dir: &str, name: &str, content: &[u8]) -> Result<u64>;

    /// Rename `dir/from` to `dir/to`, replacing `to` if present.
    async fn rename(&mut self, dir: &str, from: &str, to: &str) -> Result<()>;

    /// Tear the session down.
    async fn close(&mut self) -> Result<()>;

    /// Atomically replace `dir/name` with `content`.
    ///
    /// Uploads to [`temp_name`], checks the confirmed byte count, then
    /// renames over the target. When the confirmation does not match, the
    /// temporary artifact is left in place and the target is untouched.
    async fn write(&mut self, dir: &str, name: &str, content: &[u8]) -> Result<()> {
        let temp = temp_name(name);
        let expected = content.len() as u64;

        let accepted = self.put(dir, &temp, content).await?;
        if accepted != expected {
            return Err(Error::write_failed(
                self.host(),
                name,
                format!("remote confirmed {accepted} of {expected} bytes, left {temp} in place"),
            ));
        }

        self.rename(dir, &temp, name).await?;
        tracing::debug!(host = %self.host(), dir, file = name, bytes = expected, "atomic write complete");
        Ok(())
    }
}
