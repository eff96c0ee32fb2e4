//! Shared test utilities for the pmpsdb workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each grow their own fake PLC. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`memory`]: in-memory PLC hosts with fault injection, and a connector
//!   handing out sessions to them
//! - [`source`]: [`SourceDir`] builder for the local source-of-truth directory

pub mod memory;
pub mod source;

pub use memory::{MemoryConnector, MemoryHost, MemoryStats, MemoryTransport};
pub use source::SourceDir;
