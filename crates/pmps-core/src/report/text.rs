//! Plain-text tables

use std::fmt::Write;

use super::{HostSummary, RunReport};
use crate::model::{ContentState, FileRecord};

fn record_cell(record: Option<&FileRecord>) -> String {
    match record {
        None => "-".to_string(),
        Some(record) => match &record.content {
            ContentState::Digest(digest) => format!("{} {}B", digest.short(), record.size),
            ContentState::Unverified => format!("unverified {}B", record.size),
            ContentState::Unreadable => "unreadable".to_string(),
        },
    }
}

fn summary_line(summary: &HostSummary) -> String {
    let counts: Vec<String> = summary
        .classifications
        .iter()
        .map(|(classification, count)| format!("{classification}={count}"))
        .collect();
    format!(
        "{} | acted={} failed={} errors={}",
        counts.join(" "),
        summary.acted,
        summary.failed,
        summary.errors
    )
}

/// Render a run as one table per host followed by its errors and counts.
pub fn format_text(report: &RunReport) -> String {
    let mut out = String::new();
    let mode = if report.dry_run { " (dry run)" } else { "" };
    let _ = writeln!(out, "{}{} across {} host(s)", report.action, mode, report.hosts.len());

    for (host, summary) in report.hosts.iter().zip(report.summaries()) {
        let descriptor = &host.host;
        let _ = writeln!(out);
        let _ = write!(out, "{} [{}] {}", descriptor.hostname, descriptor.address, descriptor.remote_path);
        if !descriptor.reachable {
            let _ = write!(out, " (unreachable)");
        }
        let _ = writeln!(out);

        if !host.entries.is_empty() {
            let width = host
                .entries
                .iter()
                .map(|e| e.file_name().len())
                .max()
                .unwrap_or(0)
                .max("FILE".len());
            let _ = writeln!(
                out,
                "  {:<width$}  {:<14}  {:<23}  {:<22}  {:<22}",
                "FILE", "CLASSIFICATION", "ACTION", "LOCAL", "REMOTE"
            );
            for entry in &host.entries {
                let _ = writeln!(
                    out,
                    "  {:<width$}  {:<14}  {:<23}  {:<22}  {:<22}",
                    entry.file_name(),
                    entry.classification().as_str(),
                    entry.disposition.as_str(),
                    record_cell(entry.local()),
                    record_cell(entry.remote()),
                );
            }
        }

        if !host.errors.is_empty() {
            let _ = writeln!(out, "  errors:");
            for error in &host.errors {
                match &error.file_name {
                    Some(file) => {
                        let _ = writeln!(out, "    [{}] {}: {}", error.kind, file, error.message);
                    }
                    None => {
                        let _ = writeln!(out, "    [{}] {}", error.kind, error.message);
                    }
                }
            }
        }

        let _ = writeln!(out, "  {}", summary_line(&summary));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, DiffEntry, Disposition, ErrorKind, ErrorRecord, HostDescriptor, HostReport};
    use crate::reconcile::TieBreak;
    use chrono::Utc;
    use pmps_fs::fingerprint_bytes;

    #[test]
    fn renders_entries_errors_and_counts() {
        let fp = fingerprint_bytes(b"{}");
        let mut host = HostReport::new(HostDescriptor::new("plc-tst-motion", "/Hard Disk/ftp/pmps"));
        let mut entry = DiffEntry::new(
            "plc-tst-motion.json",
            Some(FileRecord::fingerprinted("plc-tst-motion.json", fp, None)),
            None,
            TieBreak::PreferLocal,
        );
        entry.disposition = Disposition::WouldPush;
        host.entries.push(entry);
        host.errors.push(ErrorRecord::new(
            "plc-tst-motion",
            Some("broken.json"),
            ErrorKind::IncompleteRead,
            "received 3 of 9 bytes",
        ));

        let now = Utc::now();
        let text = format_text(&RunReport {
            action: Action::Push,
            dry_run: true,
            started_at: now,
            finished_at: now,
            hosts: vec![host],
        });

        assert!(text.starts_with("PUSH (dry run) across 1 host(s)"));
        assert!(text.contains("plc-tst-motion.json"));
        assert!(text.contains("LOCAL_MISSING"));
        assert!(text.contains("would push"));
        assert!(text.contains(&fp.digest.short()));
        assert!(text.contains("[IncompleteRead] broken.json: received 3 of 9 bytes"));
        assert!(text.contains("LOCAL_MISSING=1"));
        assert!(text.contains("UNREADABLE=0"));
    }

    #[test]
    fn unreachable_host_is_marked() {
        let mut descriptor = HostDescriptor::new("plc-gone", "/pmps");
        descriptor.reachable = false;
        let now = Utc::now();
        let text = format_text(&RunReport {
            action: Action::Verify,
            dry_run: false,
            started_at: now,
            finished_at: now,
            hosts: vec![HostReport::new(descriptor)],
        });

        assert!(text.contains("plc-gone [plc-gone] /pmps (unreachable)"));
    }
}
