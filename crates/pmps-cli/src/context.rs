//! Command context
//!
//! Resolves configuration once per invocation and applies the global
//! command-line overrides on top, so every command sees the same layering:
//! defaults, global file, `--config` files, environment, flags.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pmps_core::{
    CompositeRegistry, ConfigRegistry, ConfigResolver, Connector, EnvRegistry, HostDescriptor, ResolvedConfig,
    TransportConnector,
};

use crate::cli::GlobalArgs;
use crate::error::Result;

pub struct Context {
    pub config: ResolvedConfig,
    pub groups: Vec<String>,
    pub json: bool,
}

impl Context {
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config = ConfigResolver::new().with_files(global.configs.iter().cloned()).resolve()?;
        Ok(Self::with_config(config, global))
    }

    /// Apply the flag layer to an already resolved configuration.
    pub fn with_config(mut config: ResolvedConfig, global: &GlobalArgs) -> Self {
        if let Some(dir) = &global.export_dir {
            config.export_dir = Some(dir.clone());
        }
        if let Some(secs) = global.timeout {
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        Self {
            config,
            groups: global.groups.clone(),
            json: global.json,
        }
    }

    /// Configured hosts (filtered by `--group`) merged with `PMPSDB_HOSTS`.
    pub fn registry(&self) -> CompositeRegistry {
        CompositeRegistry::new()
            .with(ConfigRegistry::new(&self.config).with_groups(self.groups.clone()))
            .with(EnvRegistry::from_env(self.config.remote_path.clone()))
    }

    pub fn connector(&self) -> Result<Arc<dyn Connector>> {
        Ok(Arc::new(TransportConnector::from_config(&self.config)?))
    }

    pub fn export_dir(&self) -> Result<PathBuf> {
        Ok(self.config.require_export_dir()?)
    }

    /// Descriptor for a host named on the command line.
    pub fn host(&self, hostname: &str) -> HostDescriptor {
        self.config.host_or_default(hostname)
    }
}
