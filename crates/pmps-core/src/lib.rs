//! Deployment and verification engine for PMPS database files
//!
//! This crate coordinates the local filesystem layer and the transports,
//! implementing:
//!
//! - **Configuration resolution**: layered TOML/YAML configuration and the
//!   legacy per-beamline host mappings
//! - **Host registry**: interchangeable discovery of PLC targets
//! - **Reconciliation**: per-host classification of every file name
//! - **Orchestration**: concurrent VERIFY/PUSH/PULL runs with cancellation
//! - **Reports**: text and structured renderings of a run
//!
//! # Architecture
//!
//! ```text
//!                  pmpsdb CLI
//!                      |
//!                  pmps-core
//!                      |
//!          +-----------+-----------+
//!          |                       |
//!       pmps-fs             pmps-transport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pmps_core::{Action, Orchestrator, TransportConnector, config::ConfigResolver};
//!
//! let config = ConfigResolver::new().resolve()?;
//! let orchestrator = Orchestrator::new(Arc::new(TransportConnector::from_config(&config)?));
//! let report = orchestrator
//!     .run(&config.require_export_dir()?, config.hosts.clone(), &config.run_options(Action::Verify)?)
//!     .await?;
//! println!("{}", pmps_core::report::format_text(&report));
//! ```

pub mod config;
pub mod deploy;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod report;

pub use config::{ConfigResolver, Manifest, ResolvedConfig, TransportKind};
pub use deploy::{Connector, FileLocks, Orchestrator, RunOptions, TransportConnector};
pub use error::{Error, Result};
pub use model::{
    Action, Classification, ContentState, DiffEntry, Disposition, ErrorKind, ErrorRecord, FileRecord, HostDescriptor,
    HostReport,
};
pub use reconcile::{CompareMode, FileSelection, LocalSnapshot, ReconcileOptions, Reconciler, TieBreak, classify};
pub use registry::{
    CachedRegistry, CompositeRegistry, ConfigRegistry, Discovery, EnvRegistry, HostRegistry, StaticRegistry,
};
pub use report::{Outcome, RunReport, format_text, to_json};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn source_unavailable_displays_path() {
        let error = Error::SourceUnavailable {
            path: PathBuf::from("/exports/pmps"),
            reason: "No such file or directory".into(),
        };

        let display = format!("{}", error);
        assert!(display.contains("/exports/pmps"), "got: {}", display);
        assert!(display.contains("No such file"), "got: {}", display);
    }
}
