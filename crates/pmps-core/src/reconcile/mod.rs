//! Reconciliation of a local directory against one host
//!
//! The local side comes from a [`LocalSnapshot`] taken once per run and the
//! remote side is listed per host. Names are unioned and every name is
//! classified from a [`FileRecord`](crate::FileRecord) per side. Names are visited in
//! lexicographic order so repeated runs produce identical reports.

mod classify;
mod engine;
mod selection;
mod snapshot;

pub use classify::{TieBreak, classify};
pub use engine::{CompareMode, ReconcileOptions, Reconciler, Reconciliation};
pub use selection::FileSelection;
pub use snapshot::LocalSnapshot;

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Drive `future` unless `cancel` fires first.
pub(crate) async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
