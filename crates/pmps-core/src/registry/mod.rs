//! Host discovery
//!
//! A [`HostRegistry`] resolves the PLCs a run targets. Concrete lookup
//! mechanisms are interchangeable behind the trait:
//!
//! - [`StaticRegistry`]: an explicit list
//! - [`ConfigRegistry`]: hosts from resolved configuration, filtered by group
//! - [`EnvRegistry`]: a comma-separated list in `PMPSDB_HOSTS`
//! - [`CompositeRegistry`]: several registries merged by hostname
//! - [`CachedRegistry`]: memoises another registry until invalidated
//!
//! Discovery never fails as a whole. A host that cannot be resolved still
//! yields a descriptor, marked unreachable, with an error alongside.

mod cached;
mod probe;
mod sources;

pub use cached::CachedRegistry;
pub use probe::{ProbeOptions, probe};
pub use sources::{CompositeRegistry, ConfigRegistry, ENV_HOSTS, EnvRegistry, StaticRegistry};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{ErrorRecord, HostDescriptor};

/// Hosts found by one discovery pass, with any per-host resolution errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    pub hosts: Vec<HostDescriptor>,
    pub errors: Vec<ErrorRecord>,
}

impl Discovery {
    pub fn new(hosts: Vec<HostDescriptor>) -> Self {
        Self {
            hosts,
            errors: Vec::new(),
        }
    }

    pub fn host(&self, hostname: &str) -> Option<&HostDescriptor> {
        self.hosts.iter().find(|h| h.hostname == hostname)
    }

    /// Keep only the named hosts, in the order requested. Names no registry
    /// knows are returned separately.
    pub fn select(&self, hostnames: &[String]) -> (Vec<HostDescriptor>, Vec<String>) {
        if hostnames.is_empty() {
            return (self.hosts.clone(), Vec::new());
        }
        let mut selected = Vec::new();
        let mut unknown = Vec::new();
        for name in hostnames {
            match self.host(name) {
                Some(host) => selected.push(host.clone()),
                None => unknown.push(name.clone()),
            }
        }
        (selected, unknown)
    }
}

#[async_trait]
pub trait HostRegistry: Send + Sync {
    async fn discover(&self) -> Discovery;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_preserves_request_order_and_reports_unknown() {
        let discovery = Discovery::new(vec![
            HostDescriptor::new("plc-a", "/pmps"),
            HostDescriptor::new("plc-b", "/pmps"),
        ]);

        let (selected, unknown) = discovery.select(&["plc-b".into(), "plc-x".into(), "plc-a".into()]);
        let names: Vec<_> = selected.iter().map(|h| h.hostname.as_str()).collect();

        assert_eq!(names, vec!["plc-b", "plc-a"]);
        assert_eq!(unknown, vec!["plc-x".to_string()]);
    }

    #[test]
    fn empty_selection_takes_all() {
        let discovery = Discovery::new(vec![HostDescriptor::new("plc-a", "/pmps")]);
        let (selected, unknown) = discovery.select(&[]);
        assert_eq!(selected.len(), 1);
        assert!(unknown.is_empty());
    }
}
