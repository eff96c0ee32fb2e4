//! Registry implementations

use std::collections::HashMap;

use async_trait::async_trait;

use super::{Discovery, HostRegistry};
use crate::config::ResolvedConfig;
use crate::model::{ErrorKind, ErrorRecord, HostDescriptor};

/// Environment variable listing extra hosts, comma separated.
pub const ENV_HOSTS: &str = "PMPSDB_HOSTS";

/// A fixed list of hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    hosts: Vec<HostDescriptor>,
}

impl StaticRegistry {
    pub fn new(hosts: Vec<HostDescriptor>) -> Self {
        Self { hosts }
    }
}

#[async_trait]
impl HostRegistry for StaticRegistry {
    async fn discover(&self) -> Discovery {
        Discovery::new(self.hosts.clone())
    }
}

/// Hosts from resolved configuration, optionally restricted to groups.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    hosts: Vec<HostDescriptor>,
    groups: Vec<String>,
}

impl ConfigRegistry {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            hosts: config.hosts.clone(),
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }
}

#[async_trait]
impl HostRegistry for ConfigRegistry {
    async fn discover(&self) -> Discovery {
        let mut discovery = Discovery::default();
        for host in &self.hosts {
            if host.hostname.trim().is_empty() {
                discovery.errors.push(ErrorRecord::new(
                    "",
                    None,
                    ErrorKind::HostUnreachable,
                    "configured host has an empty hostname",
                ));
                continue;
            }
            if host.in_any_group(&self.groups) {
                discovery.hosts.push(host.clone());
            }
        }
        tracing::debug!(hosts = discovery.hosts.len(), groups = ?self.groups, "Config discovery");
        discovery
    }
}

/// Hosts named in an environment variable.
#[derive(Debug, Clone)]
pub struct EnvRegistry {
    value: Option<String>,
    remote_path: String,
}

impl EnvRegistry {
    /// Read [`ENV_HOSTS`] from the process environment.
    pub fn from_env(remote_path: impl Into<String>) -> Self {
        Self::from_value(std::env::var(ENV_HOSTS).ok(), remote_path)
    }

    pub fn from_value(value: Option<String>, remote_path: impl Into<String>) -> Self {
        Self {
            value,
            remote_path: remote_path.into(),
        }
    }
}

#[async_trait]
impl HostRegistry for EnvRegistry {
    async fn discover(&self) -> Discovery {
        let hosts = self
            .value
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| HostDescriptor::new(name, self.remote_path.clone()))
            .collect();
        Discovery::new(hosts)
    }
}

/// Several registries merged in order. A later registry's descriptor for a
/// hostname replaces an earlier one in place.
#[derive(Default)]
pub struct CompositeRegistry {
    registries: Vec<Box<dyn HostRegistry>>,
}

impl CompositeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, registry: impl HostRegistry + 'static) -> Self {
        self.registries.push(Box::new(registry));
        self
    }
}

#[async_trait]
impl HostRegistry for CompositeRegistry {
    async fn discover(&self) -> Discovery {
        let mut merged = Discovery::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        for registry in &self.registries {
            let found = registry.discover().await;
            for host in found.hosts {
                match index.get(&host.hostname) {
                    Some(&i) => merged.hosts[i] = host,
                    None => {
                        index.insert(host.hostname.clone(), merged.hosts.len());
                        merged.hosts.push(host);
                    }
                }
            }
            merged.errors.extend(found.errors);
        }
        merged
    }
}
