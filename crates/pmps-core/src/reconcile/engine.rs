//! Per-host reconciliation

use std::collections::{BTreeMap, BTreeSet, HashMap};

use pmps_fs::{fingerprint_bytes, is_hidden};
use pmps_transport::{RemoteEntry, Transport};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{FileSelection, LocalSnapshot, TieBreak, until_cancelled};
use crate::model::{DiffEntry, ErrorKind, ErrorRecord, FileRecord, HostDescriptor, HostReport};

/// How both-present files are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompareMode {
    /// Fetch and fingerprint both sides. Authoritative.
    #[default]
    Digest,
    /// Skip the fetch when listed sizes already differ.
    SizeFirst,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub compare: CompareMode,
    pub tie_break: TieBreak,
    pub selection: FileSelection,
}

/// Result of reconciling one host.
#[derive(Debug)]
pub struct Reconciliation {
    pub report: HostReport,
    /// Remote content read while fingerprinting, by file name.
    pub fetched: HashMap<String, Vec<u8>>,
}

impl Reconciliation {
    fn failed(host: HostDescriptor, error: ErrorRecord) -> Self {
        let mut report = HostReport::new(host);
        report.errors.push(error);
        Self {
            report,
            fetched: HashMap::new(),
        }
    }
}

fn listed_remote(entry: &RemoteEntry) -> FileRecord {
    FileRecord::listed(&entry.name, entry.size, entry.modified_at)
}

/// Lists one host and classifies every file name against a local snapshot.
pub struct Reconciler<'a> {
    local: &'a LocalSnapshot,
    options: &'a ReconcileOptions,
    cancel: &'a CancellationToken,
}

impl<'a> Reconciler<'a> {
    pub fn new(local: &'a LocalSnapshot, options: &'a ReconcileOptions, cancel: &'a CancellationToken) -> Self {
        Self { local, options, cancel }
    }

    /// Reconcile `host` through `transport`.
    ///
    /// Never fails: listing errors leave the report without entries and with
    /// one error, per-file errors downgrade that entry to unreadable, and
    /// cancellation records every name not yet examined.
    pub async fn reconcile(&self, mut host: HostDescriptor, transport: &mut dyn Transport) -> Reconciliation {
        let hostname = host.hostname.clone();

        let listed = until_cancelled(self.cancel, transport.list(&host.remote_path)).await;
        let remote = match listed {
            None => return Reconciliation::failed(host, ErrorRecord::cancelled(&hostname, None)),
            Some(Err(e)) => {
                tracing::warn!(host = %hostname, error = %e, "remote listing failed");
                if e.is_connection_loss() {
                    host.reachable = false;
                }
                let error = ErrorRecord::from_transport(&hostname, None, &e);
                return Reconciliation::failed(host, error);
            }
            Some(Ok(entries)) => {
                host.reachable = true;
                entries
            }
        };

        let selection = &self.options.selection;
        let remote: BTreeMap<&str, &RemoteEntry> = remote
            .iter()
            .filter(|e| !is_hidden(&e.name) && selection.matches(&e.name))
            .map(|e| (e.name.as_str(), e))
            .collect();
        let names: BTreeSet<&str> = self
            .local
            .names()
            .filter(|name| selection.matches(name))
            .chain(remote.keys().copied())
            .collect();

        let mut report = HostReport::new(host);
        let mut fetched = HashMap::new();

        for requested in selection.explicit_names() {
            if !names.contains(requested.as_str()) {
                report.errors.push(ErrorRecord::new(
                    &hostname,
                    Some(requested.as_str()),
                    ErrorKind::PathNotFound,
                    "requested file is present neither locally nor on the host",
                ));
            }
        }

        let mut pending = names.into_iter();
        while let Some(name) = pending.next() {
            let examined = if self.cancel.is_cancelled() {
                None
            } else {
                self.examine(
                    &report.host,
                    transport,
                    name,
                    remote.get(name).copied(),
                    &mut report.errors,
                    &mut fetched,
                )
                .await
            };

            match examined {
                Some(entry) => {
                    tracing::debug!(host = %hostname, file = name, classification = %entry.classification(), "classified");
                    report.entries.push(entry);
                }
                None => {
                    tracing::info!(host = %hostname, file = name, "reconciliation cancelled");
                    report.errors.push(ErrorRecord::cancelled(&hostname, Some(name)));
                    report
                        .errors
                        .extend(pending.by_ref().map(|rest| ErrorRecord::cancelled(&hostname, Some(rest))));
                    break;
                }
            }
        }

        Reconciliation { report, fetched }
    }

    /// Build the entry for one name. `None` means cancelled mid-fetch.
    async fn examine(
        &self,
        host: &HostDescriptor,
        transport: &mut dyn Transport,
        name: &str,
        remote: Option<&RemoteEntry>,
        errors: &mut Vec<ErrorRecord>,
        fetched: &mut HashMap<String, Vec<u8>>,
    ) -> Option<DiffEntry> {
        let tie_break = self.options.tie_break;
        let local = self.local.listed(name);
        if let Some(error) = self.local.error_for(&host.hostname, name) {
            tracing::warn!(host = %host.hostname, file = name, message = %error.message, "local file unreadable");
            errors.push(error);
            return Some(DiffEntry::new(name, local, remote.map(listed_remote), tie_break));
        }

        let (local, remote) = match (local, remote) {
            (Some(local), Some(remote)) => (local, remote),
            (local, remote) => return Some(DiffEntry::new(name, local, remote.map(listed_remote), tie_break)),
        };

        if self.options.compare == CompareMode::SizeFirst && local.size != remote.size {
            return Some(DiffEntry::new(name, Some(local), Some(listed_remote(remote)), tie_break));
        }

        let Some(local_record) = self.local.fingerprinted(name) else {
            return Some(DiffEntry::new(name, Some(local), Some(listed_remote(remote)), tie_break));
        };

        let remote_record = match until_cancelled(self.cancel, transport.read(&host.remote_path, name)).await? {
            Ok(content) => {
                let fingerprint = fingerprint_bytes(&content);
                fetched.insert(name.to_string(), content);
                FileRecord::fingerprinted(name, fingerprint, remote.modified_at)
            }
            Err(e) => {
                tracing::warn!(host = %host.hostname, file = name, error = %e, "remote read failed");
                errors.push(ErrorRecord::from_transport(&host.hostname, Some(name), &e));
                listed_remote(remote).into_unreadable()
            }
        };

        Some(DiffEntry::new(name, Some(local_record), Some(remote_record), tie_break))
    }
}
