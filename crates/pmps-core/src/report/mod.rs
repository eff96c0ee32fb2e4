//! Run reports and their presentation
//!
//! A [`RunReport`] holds every [`HostReport`] of one run. The functions here
//! are pure transformations of it: [`format_text`] for terminals and
//! [`to_json`] for structured consumers. Neither drops entries or errors.

mod text;

pub use text::format_text;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::model::{Action, Classification, Disposition, HostReport};

/// Outcome class of a run that started.
///
/// A run that could not start is the `Err` of
/// [`Orchestrator::run`](crate::Orchestrator::run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No errors, no unreadable entries and no failed actions on any host.
    Clean,
    /// Something needs attention.
    Warnings,
}

impl Outcome {
    /// Process exit code for the calling CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Clean => 0,
            Outcome::Warnings => 2,
        }
    }
}

/// The full result of one orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub action: Action,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub hosts: Vec<HostReport>,
}

impl RunReport {
    pub fn outcome(&self) -> Outcome {
        if self.hosts.iter().any(HostReport::has_warnings) {
            Outcome::Warnings
        } else {
            Outcome::Clean
        }
    }

    pub fn host(&self, hostname: &str) -> Option<&HostReport> {
        self.hosts.iter().find(|h| h.hostname() == hostname)
    }

    pub fn summaries(&self) -> Vec<HostSummary> {
        self.hosts.iter().map(HostSummary::of).collect()
    }
}

/// Counts for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSummary {
    pub hostname: String,
    pub reachable: bool,
    /// Every classification, including those with a zero count.
    pub classifications: BTreeMap<Classification, usize>,
    pub acted: usize,
    pub failed: usize,
    pub errors: usize,
}

impl HostSummary {
    pub fn of(report: &HostReport) -> Self {
        let mut classifications: BTreeMap<Classification, usize> =
            Classification::ALL.iter().map(|c| (*c, 0)).collect();
        for entry in &report.entries {
            *classifications.entry(entry.classification()).or_default() += 1;
        }
        let count = |wanted: &[Disposition]| {
            report
                .entries
                .iter()
                .filter(|e| wanted.contains(&e.disposition))
                .count()
        };

        Self {
            hostname: report.hostname().to_string(),
            reachable: report.host.reachable,
            classifications,
            acted: count(&[Disposition::Pushed, Disposition::Pulled]),
            failed: count(&[Disposition::Failed]),
            errors: report.errors.len(),
        }
    }
}

/// Structured form of a run, with the outcome and per-host summaries
/// alongside the full reports.
pub fn to_json(report: &RunReport) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "action": report.action,
        "dry_run": report.dry_run,
        "started_at": report.started_at,
        "finished_at": report.finished_at,
        "outcome": report.outcome(),
        "summary": serde_json::to_value(report.summaries())?,
        "hosts": serde_json::to_value(&report.hosts)?,
    }))
}
