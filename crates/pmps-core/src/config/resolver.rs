//! Configuration resolution with hierarchical merge
//!
//! The `ConfigResolver` loads and merges configuration from multiple sources
//! in a defined hierarchy, with later sources overriding earlier ones.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::manifest::{Manifest, TransportKind};
use crate::deploy::{DEFAULT_MAX_CONCURRENT_HOSTS, RunOptions};
use crate::model::{Action, HostDescriptor};
use crate::reconcile::{CompareMode, FileSelection, TieBreak};
use crate::{Error, Result};

/// Directory PMPS database files are deployed to on every PLC.
pub const DEFAULT_REMOTE_PATH: &str = "/Hard Disk/ftp/pmps";
pub const DEFAULT_USER: &str = "Administrator";
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_EXPORT_DIR: &str = "PMPSDB_EXPORT_DIR";
pub const ENV_REMOTE_PATH: &str = "PMPSDB_REMOTE_PATH";

const GLOBAL_FILE_NAMES: [&str; 3] = ["config.toml", "config.yaml", "config.yml"];

/// The effective configuration after merging all sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub remote_path: String,
    pub user: Option<String>,
    pub port: u16,
    pub transport: TransportKind,
    pub mount_root: Option<PathBuf>,
    pub identity_file: Option<PathBuf>,
    pub ssh_options: Vec<String>,

    pub compare: CompareMode,
    pub tie_break: TieBreak,
    pub timeout: Option<Duration>,
    pub max_concurrent_hosts: usize,
    pub verify_writes: bool,
    pub include: Option<String>,
    pub export_dir: Option<PathBuf>,

    /// Configured hosts with per-host overrides applied
    pub hosts: Vec<HostDescriptor>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::from(Manifest::default())
    }
}

impl From<Manifest> for ResolvedConfig {
    fn from(manifest: Manifest) -> Self {
        let defaults = manifest.defaults;
        let engine = manifest.engine;
        let remote_path = defaults
            .remote_path
            .unwrap_or_else(|| DEFAULT_REMOTE_PATH.to_string());

        let hosts = manifest
            .hosts
            .into_iter()
            .map(|entry| HostDescriptor {
                address: entry.address.unwrap_or_else(|| entry.hostname.clone()),
                remote_path: entry.remote_path.unwrap_or_else(|| remote_path.clone()),
                reachable: true,
                ioc_prefix: entry.ioc_prefix,
                groups: entry.groups,
                hostname: entry.hostname,
            })
            .collect();

        let timeout_secs = engine.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            remote_path,
            user: defaults.user.or_else(|| Some(DEFAULT_USER.to_string())),
            port: defaults.port.unwrap_or(DEFAULT_SSH_PORT),
            transport: defaults.transport.unwrap_or_default(),
            mount_root: defaults.mount_root,
            identity_file: defaults.identity_file,
            ssh_options: defaults.ssh_options,
            compare: engine.compare.unwrap_or_default(),
            tie_break: engine.tie_break.unwrap_or_default(),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_concurrent_hosts: engine
                .max_concurrent_hosts
                .unwrap_or(DEFAULT_MAX_CONCURRENT_HOSTS)
                .max(1),
            verify_writes: engine.verify_writes.unwrap_or(false),
            include: engine.include,
            export_dir: engine.export_dir,
            hosts,
        }
    }
}

impl ResolvedConfig {
    pub fn host(&self, hostname: &str) -> Option<&HostDescriptor> {
        self.hosts.iter().find(|h| h.hostname == hostname)
    }

    /// Descriptor for `hostname`, synthesised from the defaults when the
    /// host is not configured.
    pub fn host_or_default(&self, hostname: &str) -> HostDescriptor {
        self.host(hostname)
            .cloned()
            .unwrap_or_else(|| HostDescriptor::new(hostname, self.remote_path.clone()))
    }

    /// Local directory holding database exports.
    pub fn require_export_dir(&self) -> Result<PathBuf> {
        self.export_dir.clone().ok_or_else(|| Error::InvalidConfig {
            message: format!("no export directory configured (set [engine] export_dir, {ENV_EXPORT_DIR} or --export-dir)"),
        })
    }

    /// Run options carrying the configured engine behaviour.
    pub fn run_options(&self, action: Action) -> Result<RunOptions> {
        let mut selection = FileSelection::all();
        if let Some(include) = &self.include {
            selection = selection.with_pattern(include)?;
        }
        Ok(RunOptions::new(action)
            .selection(selection)
            .compare(self.compare)
            .tie_break(self.tie_break)
            .timeout(self.timeout)
            .verify_writes(self.verify_writes)
            .max_concurrent_hosts(self.max_concurrent_hosts))
    }
}

/// Resolves configuration by merging multiple sources
///
/// Sources, later overriding earlier:
/// 1. Built-in defaults
/// 2. Global file `<config_dir>/pmpsdb/config.{toml,yaml,yml}`
/// 3. Each explicitly given file, in order
/// 4. Environment (`PMPSDB_EXPORT_DIR`, `PMPSDB_REMOTE_PATH`)
///
/// Command-line flags are applied by the caller on the result.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    files: Vec<PathBuf>,

    /// Override for the global config directory (used for testing).
    /// When `None`, the platform-appropriate directory is used via `dirs::config_dir()`.
    global_config_dir_override: Option<PathBuf>,

    /// Replaces the process environment when set (used for testing).
    env_override: Option<HashMap<String, String>>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.files.extend(files);
        self
    }

    /// Create a resolver with a custom global config directory.
    pub fn with_global_config_dir(mut self, dir: PathBuf) -> Self {
        self.global_config_dir_override = Some(dir);
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env_override = Some(env);
        self
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("pmpsdb"))
    }

    fn env_var(&self, key: &str) -> Option<String> {
        let value = match &self.env_override {
            Some(env) => env.get(key).cloned(),
            None => std::env::var(key).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Resolve the configuration by merging all sources
    ///
    /// A missing global file is skipped; a missing explicitly requested file
    /// is an error, as is any file that fails to parse.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let mut manifest = Manifest::default();

        // Layer 2 - Global config
        if let Some(global_dir) = self.global_config_dir() {
            match GLOBAL_FILE_NAMES.iter().map(|n| global_dir.join(n)).find(|p| p.is_file()) {
                Some(path) => {
                    tracing::debug!(?path, "Loading global config (layer 2)");
                    manifest.merge(&Manifest::load(&path)?);
                }
                None => tracing::debug!(?global_dir, "No global config found (layer 2), skipping"),
            }
        }

        // Layer 3 - Explicit files
        for path in &self.files {
            if !path.is_file() {
                return Err(Error::ConfigNotFound { path: path.clone() });
            }
            tracing::debug!(?path, "Loading config (layer 3)");
            manifest.merge(&Manifest::load(path)?);
        }

        // Layer 4 - Environment
        if let Some(dir) = self.env_var(ENV_EXPORT_DIR) {
            tracing::debug!(%dir, "Export directory from environment (layer 4)");
            manifest.engine.export_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = self.env_var(ENV_REMOTE_PATH) {
            tracing::debug!(%path, "Remote path from environment (layer 4)");
            manifest.defaults.remote_path = Some(path);
        }

        Ok(ResolvedConfig::from(manifest))
    }
}
