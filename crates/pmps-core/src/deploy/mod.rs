//! Deployment across many hosts
//!
//! The [`Orchestrator`] runs one task per host on a bounded
//! [`JoinSet`](tokio::task::JoinSet). Each task owns its transport session
//! and works strictly sequentially against it: list, per-file read/write,
//! close. Cancellation (explicit or by run timeout) stops further file
//! operations; remaining files are recorded as cancelled.

mod connector;
mod locks;
mod options;
mod orchestrator;

pub use connector::{Connector, TransportConnector};
pub use locks::FileLocks;
pub use options::{DEFAULT_MAX_CONCURRENT_HOSTS, RunOptions};
pub use orchestrator::Orchestrator;
