//! Options for one orchestrated run

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::model::Action;
use crate::reconcile::{CompareMode, FileSelection, ReconcileOptions, TieBreak};

/// Hosts processed at once when nothing else is configured.
pub const DEFAULT_MAX_CONCURRENT_HOSTS: usize = 16;

/// Options for an orchestrated run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub action: Action,
    /// Record intended transfers without executing them.
    pub dry_run: bool,
    pub reconcile: ReconcileOptions,
    /// Run-level deadline. When it passes, the run behaves as if cancelled.
    pub timeout: Option<Duration>,
    /// Re-read each pushed file and compare digests.
    pub verify_writes: bool,
    pub max_concurrent_hosts: usize,
    /// Explicit cancellation from the caller.
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            dry_run: false,
            reconcile: ReconcileOptions::default(),
            timeout: None,
            verify_writes: false,
            max_concurrent_hosts: DEFAULT_MAX_CONCURRENT_HOSTS,
            cancel: CancellationToken::new(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn selection(mut self, selection: FileSelection) -> Self {
        self.reconcile.selection = selection;
        self
    }

    pub fn compare(mut self, compare: CompareMode) -> Self {
        self.reconcile.compare = compare;
        self
    }

    pub fn tie_break(mut self, tie_break: TieBreak) -> Self {
        self.reconcile.tie_break = tie_break;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn verify_writes(mut self, verify_writes: bool) -> Self {
        self.verify_writes = verify_writes;
        self
    }

    pub fn max_concurrent_hosts(mut self, max: usize) -> Self {
        self.max_concurrent_hosts = max.max(1);
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
