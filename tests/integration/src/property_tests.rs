//! Run-level properties: idempotent verification, push/pull round trips and
//! cancellation safety across many hosts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pmps_core::{Action, Classification, ErrorKind, HostDescriptor, Orchestrator, Outcome, RunOptions};
use pmps_test_utils::{MemoryConnector, MemoryHost, SourceDir};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const REMOTE_PATH: &str = "/Hard Disk/ftp/pmps";

fn file_names(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("plc-tst-{i:02}.json")).collect()
}

/// `hosts` PLCs, each holding a stale copy of every file in `names`.
fn stale_fleet(hosts: usize, names: &[String]) -> (MemoryConnector, Vec<(String, MemoryHost)>) {
    let stale_at = Utc.timestamp_opt(1_500_000_000, 0).single();
    let mut connector = MemoryConnector::new();
    let mut fleet = Vec::new();
    for i in 0..hosts {
        let hostname = format!("plc-{i:02}");
        let memory = MemoryHost::new();
        for name in names {
            memory.put_file(name, format!("old {name}"), stale_at);
        }
        connector = connector.with_host(&hostname, memory.clone());
        fleet.push((hostname, memory));
    }
    (connector, fleet)
}

fn descriptors(fleet: &[(String, MemoryHost)]) -> Vec<HostDescriptor> {
    fleet
        .iter()
        .map(|(hostname, _)| HostDescriptor::new(hostname, REMOTE_PATH))
        .collect()
}

#[tokio::test]
async fn test_verify_twice_gives_identical_reports() {
    let names = file_names(6);
    let source = SourceDir::new();
    for name in &names[..4] {
        source.write(name, format!("new {name}"));
    }
    source.write("local-only.json", "l");
    let (connector, fleet) = stale_fleet(3, &names);
    fleet[1].1.truncate_reads_of(&names[0]);
    let orchestrator = Orchestrator::new(Arc::new(connector));

    let first = orchestrator
        .run(source.path(), descriptors(&fleet), &RunOptions::new(Action::Verify))
        .await
        .unwrap();
    let second = orchestrator
        .run(source.path(), descriptors(&fleet), &RunOptions::new(Action::Verify))
        .await
        .unwrap();

    assert_eq!(first.hosts, second.hosts);
    assert_eq!(
        first.hosts[1].entry(&names[0]).unwrap().classification(),
        Classification::Unreadable
    );
    for (_, memory) in &fleet {
        assert_eq!(memory.stats().puts, 0);
    }
}

#[tokio::test]
async fn test_push_then_verify_is_identical_on_every_host() {
    let names = file_names(5);
    let source = SourceDir::new();
    for name in &names {
        source.write(name, format!("new {name}"));
    }
    let (connector, fleet) = stale_fleet(4, &names[..2]);
    let orchestrator = Orchestrator::new(Arc::new(connector));

    let push = orchestrator
        .run(source.path(), descriptors(&fleet), &RunOptions::new(Action::Push))
        .await
        .unwrap();
    assert_eq!(push.outcome(), Outcome::Clean);

    let verify = orchestrator
        .run(source.path(), descriptors(&fleet), &RunOptions::new(Action::Verify))
        .await
        .unwrap();
    for host_report in &verify.hosts {
        assert_eq!(host_report.entries.len(), names.len());
        for entry in &host_report.entries {
            assert_eq!(
                entry.classification(),
                Classification::Identical,
                "{} on {}",
                entry.file_name(),
                host_report.hostname()
            );
        }
    }
}

#[tokio::test]
async fn test_pull_then_verify_is_identical() {
    let names = file_names(3);
    let source = SourceDir::new();
    let fresh_at = Utc.timestamp_opt(Utc::now().timestamp() + 600, 0).single();
    let memory = MemoryHost::new();
    for name in &names {
        memory.put_file(name, format!("plc {name}"), fresh_at);
    }
    let orchestrator = Orchestrator::new(Arc::new(MemoryConnector::new().with_host("plc-a", memory)));
    let hosts = vec![HostDescriptor::new("plc-a", REMOTE_PATH)];

    orchestrator
        .run(source.path(), hosts.clone(), &RunOptions::new(Action::Pull))
        .await
        .unwrap();
    let verify = orchestrator
        .run(source.path(), hosts, &RunOptions::new(Action::Verify))
        .await
        .unwrap();

    for entry in &verify.hosts[0].entries {
        assert_eq!(entry.classification(), Classification::Identical);
    }
    assert_eq!(verify.outcome(), Outcome::Clean);
}

#[tokio::test]
async fn test_cancellation_never_leaves_partial_files() {
    let names = file_names(8);
    let source = SourceDir::new();
    for name in &names {
        source.write(name, format!("new {name}"));
    }
    let (connector, fleet) = stale_fleet(4, &names);
    for (_, memory) in &fleet {
        memory.set_delay(Some(Duration::from_millis(15)));
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        trigger.cancel();
    });

    let report = Orchestrator::new(Arc::new(connector))
        .run(
            source.path(),
            descriptors(&fleet),
            &RunOptions::new(Action::Push).cancel_token(cancel),
        )
        .await
        .unwrap();

    assert_eq!(report.hosts.len(), fleet.len());
    assert!(
        report
            .hosts
            .iter()
            .flat_map(|h| &h.errors)
            .any(|e| e.kind == ErrorKind::Cancelled)
    );
    for (hostname, memory) in &fleet {
        for name in &names {
            let content = String::from_utf8(memory.file(name).unwrap()).unwrap();
            assert!(
                content == format!("old {name}") || content == format!("new {name}"),
                "{name} on {hostname} holds {content:?}"
            );
        }
    }
}
