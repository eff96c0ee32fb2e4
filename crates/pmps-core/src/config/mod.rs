//! Configuration loading and resolution
//!
//! Configuration files are TOML or YAML, detected by extension. Sources are
//! merged in order (later overrides earlier):
//!
//! 1. **Built-in defaults** - `/Hard Disk/ftp/pmps`, user `Administrator`, port 22
//! 2. **Global file** - `<config_dir>/pmpsdb/config.{toml,yaml,yml}`
//! 3. **Explicit files** - each `--config` file, hosts accumulating by name
//! 4. **Environment** - `PMPSDB_EXPORT_DIR`, `PMPSDB_REMOTE_PATH`
//!
//! # Example
//!
//! ```ignore
//! use pmps_core::config::ConfigResolver;
//!
//! let config = ConfigResolver::new()
//!     .with_files(["pmpsdb_tst.yml".into()])
//!     .resolve()?;
//! for host in &config.hosts {
//!     println!("{} -> {}", host.hostname, host.remote_path);
//! }
//! ```

mod manifest;
mod resolver;

pub use manifest::{DefaultsSection, EngineSection, HostEntry, Manifest, TransportKind};
pub use resolver::{
    ConfigResolver, DEFAULT_REMOTE_PATH, DEFAULT_SSH_PORT, DEFAULT_TIMEOUT_SECS, DEFAULT_USER, ENV_EXPORT_DIR,
    ENV_REMOTE_PATH, ResolvedConfig,
};
