//! Local filesystem layer for PMPS database deployment
//!
//! Provides content fingerprints, atomic locked writes and listings of the
//! local source-of-truth directory.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod io;
pub mod listing;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use fingerprint::{Digest, Fingerprint, fingerprint_bytes, fingerprint_file, fingerprint_reader};
pub use listing::{DirListing, LocalEntry, UnreadableEntry, is_hidden, list_dir, truncate_to_seconds};
