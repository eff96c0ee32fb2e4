//! Concurrent per-host runs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use pmps_fs::fingerprint_bytes;
use pmps_fs::io::{read_bytes, set_modified, write_atomic};
use pmps_transport::Transport;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::{Connector, FileLocks, RunOptions};
use crate::model::{Action, Disposition, ErrorKind, ErrorRecord, HostDescriptor, HostReport};
use crate::reconcile::{FileSelection, LocalSnapshot, ReconcileOptions, Reconciler, Reconciliation, until_cancelled};
use crate::report::RunReport;
use crate::{Error, Result};

/// Why a single file action did not complete.
enum FileFailure {
    Cancelled,
    Error(ErrorRecord),
}

/// State shared by every host task of one run.
struct RunContext {
    local: LocalSnapshot,
    options: RunOptions,
    cancel: CancellationToken,
    connector: Arc<dyn Connector>,
    locks: Arc<FileLocks>,
}

/// Drives reconciliation and transfers across many hosts.
///
/// The per-file-name locks live as long as the orchestrator, so concurrent
/// runs through the same orchestrator also serialize local writes.
pub struct Orchestrator {
    connector: Arc<dyn Connector>,
    locks: Arc<FileLocks>,
}

impl Orchestrator {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            locks: Arc::new(FileLocks::new()),
        }
    }

    /// Reconcile one host without acting on anything.
    ///
    /// Used for previews before a targeted run.
    pub async fn reconcile(&self, local_dir: &Path, host: HostDescriptor, options: &ReconcileOptions) -> Result<HostReport> {
        let local = capture(local_dir, &options.selection).await?;
        let cancel = CancellationToken::new();
        let hostname = host.hostname.clone();

        let mut transport = match self.connector.connect(&host) {
            Ok(transport) => transport,
            Err(e) => return Ok(connect_failed(host, &e)),
        };
        let reconciliation = Reconciler::new(&local, options, &cancel)
            .reconcile(host, transport.as_mut())
            .await;
        close(&hostname, transport.as_mut()).await;
        Ok(reconciliation.report)
    }

    /// Run `options.action` against every host.
    ///
    /// Hosts are processed concurrently and independently. The returned
    /// report holds one [`HostReport`] per input host, in input order. Every
    /// host is compared against one snapshot of `local_dir` taken up front.
    /// Only an unreadable `local_dir` fails the run.
    pub async fn run(&self, local_dir: &Path, hosts: Vec<HostDescriptor>, options: &RunOptions) -> Result<RunReport> {
        let local = capture(local_dir, &options.reconcile.selection).await?;
        let started_at = Utc::now();
        tracing::info!(
            action = %options.action,
            dry_run = options.dry_run,
            hosts = hosts.len(),
            source = %local_dir.display(),
            "Starting run"
        );

        let cancel = options.cancel.child_token();
        let timer = options.timeout.map(|timeout| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(?timeout, "Run timed out, cancelling remaining work");
                cancel.cancel();
            })
        });

        let context = Arc::new(RunContext {
            local,
            options: options.clone(),
            cancel: cancel.clone(),
            connector: self.connector.clone(),
            locks: self.locks.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(options.max_concurrent_hosts.max(1)));

        let mut tasks = JoinSet::new();
        for (index, host) in hosts.iter().cloned().enumerate() {
            let context = context.clone();
            let semaphore = semaphore.clone();
            let span = tracing::info_span!("host", host = %host.hostname);
            tasks.spawn(
                async move {
                    let Some(_permit) = until_cancelled(&context.cancel, semaphore.acquire_owned()).await else {
                        let hostname = host.hostname.clone();
                        let mut report = HostReport::new(host);
                        report.errors.push(ErrorRecord::cancelled(&hostname, None));
                        return (index, report);
                    };
                    (index, run_host(&context, host).await)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<HostReport>> = hosts.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => tracing::error!(error = %e, "Host task aborted"),
            }
        }
        if let Some(timer) = timer {
            timer.abort();
        }

        let reports = slots
            .into_iter()
            .zip(hosts)
            .map(|(slot, host)| {
                slot.unwrap_or_else(|| {
                    let hostname = host.hostname.clone();
                    let mut report = HostReport::new(host);
                    report.errors.push(ErrorRecord::new(
                        &hostname,
                        None,
                        ErrorKind::Cancelled,
                        "host task aborted before reporting",
                    ));
                    report
                })
            })
            .collect();

        let report = RunReport {
            action: options.action,
            dry_run: options.dry_run,
            started_at,
            finished_at: Utc::now(),
            hosts: reports,
        };
        tracing::info!(outcome = ?report.outcome(), "Run finished");
        Ok(report)
    }
}

/// Snapshot the source directory off the async workers.
async fn capture(local_dir: &Path, selection: &FileSelection) -> Result<LocalSnapshot> {
    let dir = local_dir.to_path_buf();
    let selection = selection.clone();
    let captured = tokio::task::spawn_blocking(move || LocalSnapshot::capture(&dir, &selection)).await;
    let reason = match captured {
        Ok(Ok(snapshot)) => return Ok(snapshot),
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };
    Err(Error::SourceUnavailable {
        path: local_dir.to_path_buf(),
        reason,
    })
}

/// Run blocking local file I/O on the blocking pool.
async fn local_io<T, F>(path: PathBuf, work: F) -> pmps_fs::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> pmps_fs::Result<T> + Send + 'static,
{
    let task_path = path.clone();
    tokio::task::spawn_blocking(move || work(&task_path))
        .await
        .unwrap_or_else(|e| Err(pmps_fs::Error::io(path, std::io::Error::other(e))))
}

fn connect_failed(mut host: HostDescriptor, err: &pmps_transport::Error) -> HostReport {
    tracing::warn!(host = %host.hostname, error = %err, "Could not create transport");
    if err.is_connection_loss() {
        host.reachable = false;
    }
    let hostname = host.hostname.clone();
    let mut report = HostReport::new(host);
    report.errors.push(ErrorRecord::from_transport(&hostname, None, err));
    report
}

async fn close(hostname: &str, transport: &mut dyn Transport) {
    if let Err(e) = transport.close().await {
        tracing::warn!(host = hostname, error = %e, "Closing transport failed");
    }
}

/// One host: connect, reconcile, act, close.
async fn run_host(context: &RunContext, host: HostDescriptor) -> HostReport {
    let hostname = host.hostname.clone();
    let mut transport = match context.connector.connect(&host) {
        Ok(transport) => transport,
        Err(e) => return connect_failed(host, &e),
    };

    let report = reconcile_and_act(context, host, transport.as_mut()).await;
    close(&hostname, transport.as_mut()).await;

    tracing::debug!(
        entries = report.entries.len(),
        errors = report.errors.len(),
        "Host finished"
    );
    report
}

async fn reconcile_and_act(context: &RunContext, host: HostDescriptor, transport: &mut dyn Transport) -> HostReport {
    let options = &context.options;
    let Reconciliation { mut report, mut fetched } =
        Reconciler::new(&context.local, &options.reconcile, &context.cancel)
            .reconcile(host, transport)
            .await;

    let (wanted, planned) = match options.action {
        Action::Verify => return report,
        Action::Push => (Disposition::Pushed, Disposition::WouldPush),
        Action::Pull => (Disposition::Pulled, Disposition::WouldPull),
    };

    let hostname = report.host.hostname.clone();
    let remote_dir = report.host.remote_path.clone();

    for index in 0..report.entries.len() {
        let entry = &report.entries[index];
        let applies = match options.action {
            Action::Push => entry.classification().wants_push(),
            Action::Pull => entry.classification().wants_pull(),
            Action::Verify => false,
        };
        if !applies {
            continue;
        }
        let name = entry.file_name().to_string();
        let remote_modified = entry.remote().and_then(|r| r.modified_at);

        if options.dry_run {
            tracing::info!(file = %name, action = %options.action, "[dry-run] Would transfer");
            report.entries[index].disposition = planned;
            continue;
        }

        let outcome = if context.cancel.is_cancelled() {
            Err(FileFailure::Cancelled)
        } else if options.action == Action::Push {
            push_file(context, transport, &hostname, &remote_dir, &name).await
        } else {
            let prefetched = fetched.remove(&name);
            pull_file(context, transport, &hostname, &remote_dir, &name, remote_modified, prefetched).await
        };

        report.entries[index].disposition = match outcome {
            Ok(()) => wanted,
            Err(FileFailure::Cancelled) => {
                report.errors.push(ErrorRecord::cancelled(&hostname, Some(&name)));
                Disposition::Cancelled
            }
            Err(FileFailure::Error(record)) => {
                tracing::warn!(file = %name, kind = %record.kind, message = %record.message, "Transfer failed");
                report.errors.push(record);
                Disposition::Failed
            }
        };
    }

    report
}

async fn push_file(
    context: &RunContext,
    transport: &mut dyn Transport,
    host: &str,
    remote_dir: &str,
    name: &str,
) -> std::result::Result<(), FileFailure> {
    let content = local_io(context.local.dir().join(name), read_bytes)
        .await
        .map_err(|e| FileFailure::Error(ErrorRecord::from_fs(host, Some(name), &e)))?;

    until_cancelled(&context.cancel, transport.write(remote_dir, name, &content))
        .await
        .ok_or(FileFailure::Cancelled)?
        .map_err(|e| FileFailure::Error(ErrorRecord::from_transport(host, Some(name), &e)))?;

    if context.options.verify_writes {
        match until_cancelled(&context.cancel, transport.read(remote_dir, name)).await {
            // The write itself completed; only the check was abandoned.
            None => tracing::warn!(file = name, "Cancelled before read-back verification"),
            Some(Err(e)) => return Err(FileFailure::Error(ErrorRecord::from_transport(host, Some(name), &e))),
            Some(Ok(readback)) => {
                if fingerprint_bytes(&readback) != fingerprint_bytes(&content) {
                    return Err(FileFailure::Error(ErrorRecord::new(
                        host,
                        Some(name),
                        ErrorKind::WriteFailed,
                        "read-back digest does not match pushed content",
                    )));
                }
            }
        }
    }

    tracing::info!(file = name, bytes = content.len(), "Pushed");
    Ok(())
}

async fn pull_file(
    context: &RunContext,
    transport: &mut dyn Transport,
    host: &str,
    remote_dir: &str,
    name: &str,
    remote_modified: Option<DateTime<Utc>>,
    prefetched: Option<Vec<u8>>,
) -> std::result::Result<(), FileFailure> {
    let content = match prefetched {
        Some(content) => content,
        None => until_cancelled(&context.cancel, transport.read(remote_dir, name))
            .await
            .ok_or(FileFailure::Cancelled)?
            .map_err(|e| FileFailure::Error(ErrorRecord::from_transport(host, Some(name), &e)))?,
    };

    let lock = context.locks.lock_for(name);
    let _guard = until_cancelled(&context.cancel, lock.lock())
        .await
        .ok_or(FileFailure::Cancelled)?;

    let bytes = content.len();
    local_io(context.local.dir().join(name), move |path| {
        write_atomic(path, &content)?;
        match remote_modified {
            Some(modified) => set_modified(path, SystemTime::from(modified)),
            None => Ok(()),
        }
    })
    .await
    .map_err(|e| FileFailure::Error(ErrorRecord::from_fs(host, Some(name), &e)))?;

    tracing::info!(file = name, bytes, "Pulled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_source_is_a_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = capture(&dir.path().join("missing"), &FileSelection::all()).await.unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn local_io_runs_off_the_async_workers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, "content").unwrap();

        let content = local_io(path, read_bytes).await.unwrap();
        assert_eq!(content, b"content");
    }

    #[test]
    fn connect_failure_marks_host_unreachable() {
        let host = HostDescriptor::new("plc-gone", "/pmps");
        let err = pmps_transport::Error::unreachable("plc-gone", "no route");
        let report = connect_failed(host, &err);

        assert!(!report.host.reachable);
        assert!(report.entries.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, ErrorKind::HostUnreachable);
    }
}
