//! End-to-end deployment scenarios
//!
//! Runs the orchestrator against real directories through the mount
//! transport, the same path the CLI takes for mounted PLC shares.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{TimeZone, Utc};
use pmps_core::{
    Action, Classification, Disposition, ErrorKind, HostDescriptor, Orchestrator, Outcome, RunOptions,
    TransportConnector, format_text, to_json,
};
use pmps_fs::io::set_modified;
use pmps_test_utils::SourceDir;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const REMOTE_PATH: &str = "/pmps";

// =============================================================================
// Test Infrastructure
// =============================================================================

/// PLC shares mounted under one temporary root.
struct Mounts {
    root: TempDir,
}

impl Mounts {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Create the database directory for `hostname` and return it.
    fn plc(&self, hostname: &str) -> PathBuf {
        let dir = self.root.path().join(hostname).join("pmps");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(Arc::new(TransportConnector::Mount {
            root: self.root.path().to_path_buf(),
        }))
    }
}

fn host(hostname: &str) -> HostDescriptor {
    HostDescriptor::new(hostname, REMOTE_PATH)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_identical_file_is_reported_identical() {
    let mounts = Mounts::new();
    let source = SourceDir::new();
    source.write("a.dbd", "digest X");
    fs::write(mounts.plc("plc-a").join("a.dbd"), "digest X").unwrap();

    let report = mounts
        .orchestrator()
        .run(source.path(), vec![host("plc-a")], &RunOptions::new(Action::Verify))
        .await
        .unwrap();

    let host_report = &report.hosts[0];
    assert_eq!(host_report.entries.len(), 1);
    assert_eq!(host_report.entries[0].classification(), Classification::Identical);
    assert!(host_report.errors.is_empty());
    assert_eq!(report.outcome(), Outcome::Clean);
}

#[tokio::test]
async fn test_missing_remote_file_is_pushed_then_identical() {
    let mounts = Mounts::new();
    let plc = mounts.plc("plc-a");
    let source = SourceDir::new();
    source.write("a.dbd", "database");
    let orchestrator = mounts.orchestrator();

    let verify = orchestrator
        .run(source.path(), vec![host("plc-a")], &RunOptions::new(Action::Verify))
        .await
        .unwrap();
    assert_eq!(
        verify.hosts[0].entry("a.dbd").unwrap().classification(),
        Classification::LocalMissing
    );

    let push = orchestrator
        .run(source.path(), vec![host("plc-a")], &RunOptions::new(Action::Push))
        .await
        .unwrap();
    assert_eq!(push.hosts[0].entry("a.dbd").unwrap().disposition, Disposition::Pushed);
    assert_eq!(fs::read(plc.join("a.dbd")).unwrap(), b"database");

    let verify = orchestrator
        .run(source.path(), vec![host("plc-a")], &RunOptions::new(Action::Verify))
        .await
        .unwrap();
    assert_eq!(
        verify.hosts[0].entry("a.dbd").unwrap().classification(),
        Classification::Identical
    );
}

#[tokio::test]
async fn test_unreachable_host_is_isolated() {
    let mounts = Mounts::new();
    fs::write(mounts.plc("plc-up").join("a.dbd"), "content").unwrap();
    let source = SourceDir::new();
    source.write("a.dbd", "content");

    let report = mounts
        .orchestrator()
        .run(
            source.path(),
            vec![host("plc-down"), host("plc-up")],
            &RunOptions::new(Action::Verify),
        )
        .await
        .unwrap();

    let down = report.host("plc-down").unwrap();
    assert!(down.entries.is_empty());
    assert_eq!(down.errors.len(), 1);
    assert_eq!(down.errors[0].kind, ErrorKind::HostUnreachable);
    assert!(!down.host.reachable);

    let up = report.host("plc-up").unwrap();
    assert_eq!(up.entry("a.dbd").unwrap().classification(), Classification::Identical);
    assert!(up.errors.is_empty());
}

#[tokio::test]
async fn test_equal_timestamps_favour_local_copy() {
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let mounts = Mounts::new();
    let remote = mounts.plc("plc-a").join("a.dbd");
    fs::write(&remote, "digest Z").unwrap();
    set_modified(&remote, SystemTime::from(at)).unwrap();
    let source = SourceDir::new();
    source.write_at("a.dbd", "digest Y", at);

    let report = mounts
        .orchestrator()
        .run(source.path(), vec![host("plc-a")], &RunOptions::new(Action::Verify))
        .await
        .unwrap();

    assert_eq!(
        report.hosts[0].entry("a.dbd").unwrap().classification(),
        Classification::LocalNewer
    );
}

#[tokio::test]
async fn test_missing_source_directory_aborts_run() {
    let mounts = Mounts::new();
    mounts.plc("plc-a");
    let source = SourceDir::new();

    let result = mounts
        .orchestrator()
        .run(
            &source.path().join("gone"),
            vec![host("plc-a")],
            &RunOptions::new(Action::Verify),
        )
        .await;

    assert!(matches!(result, Err(pmps_core::Error::SourceUnavailable { .. })));
}

#[tokio::test]
async fn test_reports_keep_every_entry_and_error() {
    let mounts = Mounts::new();
    let plc = mounts.plc("plc-a");
    fs::write(plc.join("remote-only.json"), "r").unwrap();
    fs::write(plc.join("same.json"), "s").unwrap();
    let source = SourceDir::new();
    source.write("same.json", "s");
    source.write("local-only.json", "l");

    let report = mounts
        .orchestrator()
        .run(
            source.path(),
            vec![host("plc-a"), host("plc-down")],
            &RunOptions::new(Action::Verify),
        )
        .await
        .unwrap();

    let text = format_text(&report);
    for needle in ["local-only.json", "remote-only.json", "same.json", "plc-down", "HostUnreachable"] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }

    let json = to_json(&report).unwrap();
    assert_eq!(json["outcome"], "warnings");
    assert_eq!(json["hosts"][0]["entries"].as_array().unwrap().len(), 3);
    assert_eq!(json["hosts"][1]["errors"][0]["kind"], "HostUnreachable");
    assert_eq!(json["summary"][0]["classifications"]["IDENTICAL"], 1);
    assert_eq!(json["summary"][0]["classifications"]["UNREADABLE"], 0);
}
