//! Data model shared by the engine, the orchestrator and the report layer

use std::fmt;

use chrono::{DateTime, Utc};
use pmps_fs::{Digest, Fingerprint};
use serde::{Deserialize, Serialize};

use crate::reconcile::{TieBreak, classify};

/// How much is known about a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentState {
    /// Content was read in full and hashed.
    Digest(Digest),
    /// Only listing metadata is known.
    Unverified,
    /// Reading the content failed.
    Unreadable,
}

/// Identity snapshot of one file on one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    /// Streamed byte length when `content` is a digest, listing size otherwise.
    pub size: u64,
    pub content: ContentState,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// A record carrying listing metadata only.
    pub fn listed(name: impl Into<String>, size: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            size,
            content: ContentState::Unverified,
            modified_at,
        }
    }

    /// A record with a full fingerprint.
    pub fn fingerprinted(name: impl Into<String>, fingerprint: Fingerprint, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            size: fingerprint.size,
            content: ContentState::Digest(fingerprint.digest),
            modified_at,
        }
    }

    /// Mark the content as unreadable, keeping listing metadata.
    pub fn into_unreadable(mut self) -> Self {
        self.content = ContentState::Unreadable;
        self
    }

    pub fn digest(&self) -> Option<&Digest> {
        match &self.content {
            ContentState::Digest(digest) => Some(digest),
            _ => None,
        }
    }

    pub fn is_unreadable(&self) -> bool {
        self.content == ContentState::Unreadable
    }
}

/// A PLC target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostDescriptor {
    pub hostname: String,
    pub address: String,
    pub remote_path: String,
    /// Outcome of the latest contact attempt. Never persisted.
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ioc_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl HostDescriptor {
    pub fn new(hostname: impl Into<String>, remote_path: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            address: hostname.clone(),
            hostname,
            remote_path: remote_path.into(),
            reachable: true,
            ioc_prefix: None,
            groups: Vec::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Name of the database file exported for this PLC.
    pub fn db_file_name(&self) -> String {
        format!("{}.json", self.hostname)
    }

    pub fn in_any_group(&self, groups: &[String]) -> bool {
        groups.is_empty() || self.groups.iter().any(|g| groups.contains(g))
    }
}

/// Outcome of comparing the two sides of one file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Identical,
    LocalNewer,
    RemoteNewer,
    /// Only the host has the file. Candidate for PULL.
    RemoteMissing,
    /// Only the local directory has the file; the host lacks it. Candidate
    /// for PUSH.
    LocalMissing,
    /// One side could not be read. Never acted on automatically.
    Unreadable,
}

impl Classification {
    pub const ALL: [Classification; 6] = [
        Classification::Identical,
        Classification::LocalNewer,
        Classification::RemoteNewer,
        Classification::RemoteMissing,
        Classification::LocalMissing,
        Classification::Unreadable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Identical => "IDENTICAL",
            Classification::LocalNewer => "LOCAL_NEWER",
            Classification::RemoteNewer => "REMOTE_NEWER",
            Classification::RemoteMissing => "REMOTE_MISSING",
            Classification::LocalMissing => "LOCAL_MISSING",
            Classification::Unreadable => "UNREADABLE",
        }
    }

    /// Whether PUSH transfers this entry.
    pub fn wants_push(&self) -> bool {
        matches!(self, Classification::LocalNewer | Classification::LocalMissing)
    }

    /// Whether PULL transfers this entry.
    pub fn wants_pull(&self) -> bool {
        matches!(self, Classification::RemoteNewer | Classification::RemoteMissing)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator did, or would do, with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The requested action does not apply to this classification.
    NotRequested,
    InSync,
    Pushed,
    Pulled,
    WouldPush,
    WouldPull,
    NeedsManualResolution,
    Failed,
    Cancelled,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::NotRequested => "-",
            Disposition::InSync => "in sync",
            Disposition::Pushed => "pushed",
            Disposition::Pulled => "pulled",
            Disposition::WouldPush => "would push",
            Disposition::WouldPull => "would pull",
            Disposition::NeedsManualResolution => "needs manual resolution",
            Disposition::Failed => "failed",
            Disposition::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One distinct file name observed on either side of a host.
///
/// The classification is derived from the two records at construction and
/// cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    file_name: String,
    local: Option<FileRecord>,
    remote: Option<FileRecord>,
    classification: Classification,
    pub disposition: Disposition,
}

impl DiffEntry {
    pub fn new(
        file_name: impl Into<String>,
        local: Option<FileRecord>,
        remote: Option<FileRecord>,
        tie_break: TieBreak,
    ) -> Self {
        let classification = classify(local.as_ref(), remote.as_ref(), tie_break);
        let disposition = match classification {
            Classification::Identical => Disposition::InSync,
            Classification::Unreadable => Disposition::NeedsManualResolution,
            _ => Disposition::NotRequested,
        };
        Self {
            file_name: file_name.into(),
            local,
            remote,
            classification,
            disposition,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn local(&self) -> Option<&FileRecord> {
        self.local.as_ref()
    }

    pub fn remote(&self) -> Option<&FileRecord> {
        self.remote.as_ref()
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }
}

/// Failure taxonomy recorded in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    HostUnreachable,
    PathNotFound,
    IncompleteRead,
    WriteFailed,
    Cancelled,
    #[serde(rename = "LocalIOError")]
    LocalIo,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::HostUnreachable => "HostUnreachable",
            ErrorKind::PathNotFound => "PathNotFound",
            ErrorKind::IncompleteRead => "IncompleteRead",
            ErrorKind::WriteFailed => "WriteFailed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::LocalIo => "LocalIOError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&pmps_transport::Error> for ErrorKind {
    fn from(err: &pmps_transport::Error) -> Self {
        match err {
            pmps_transport::Error::HostUnreachable { .. } => ErrorKind::HostUnreachable,
            pmps_transport::Error::PathNotFound { .. } => ErrorKind::PathNotFound,
            pmps_transport::Error::IncompleteRead { .. } => ErrorKind::IncompleteRead,
            pmps_transport::Error::WriteFailed { .. } => ErrorKind::WriteFailed,
        }
    }
}

impl From<&pmps_fs::Error> for ErrorKind {
    fn from(err: &pmps_fs::Error) -> Self {
        match err {
            pmps_fs::Error::IncompleteRead { .. } => ErrorKind::IncompleteRead,
            _ => ErrorKind::LocalIo,
        }
    }
}

/// A single failure captured without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub host: String,
    pub file_name: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(host: impl Into<String>, file_name: Option<&str>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            file_name: file_name.map(str::to_string),
            kind,
            message: message.into(),
        }
    }

    pub fn from_transport(host: &str, file_name: Option<&str>, err: &pmps_transport::Error) -> Self {
        Self::new(host, file_name, ErrorKind::from(err), err.to_string())
    }

    pub fn from_fs(host: &str, file_name: Option<&str>, err: &pmps_fs::Error) -> Self {
        Self::new(host, file_name, ErrorKind::from(err), err.to_string())
    }

    pub fn cancelled(host: &str, file_name: Option<&str>) -> Self {
        let message = match file_name {
            Some(_) => "run cancelled before this file was handled",
            None => "run cancelled before this host was handled",
        };
        Self::new(host, file_name, ErrorKind::Cancelled, message)
    }
}

/// Everything learned about one host in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReport {
    pub host: HostDescriptor,
    pub entries: Vec<DiffEntry>,
    pub errors: Vec<ErrorRecord>,
}

impl HostReport {
    pub fn new(host: HostDescriptor) -> Self {
        Self {
            host,
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.host.hostname
    }

    pub fn entry(&self, file_name: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.file_name() == file_name)
    }

    /// Whether anything here needs a human: errors, unreadable entries or
    /// failed actions.
    pub fn has_warnings(&self) -> bool {
        !self.errors.is_empty()
            || self.entries.iter().any(|e| {
                e.classification() == Classification::Unreadable
                    || matches!(e.disposition, Disposition::Failed | Disposition::Cancelled)
            })
    }
}

/// The operation a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Verify,
    Push,
    Pull,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Verify => "VERIFY",
            Action::Push => "PUSH",
            Action::Pull => "PULL",
        })
    }
}
