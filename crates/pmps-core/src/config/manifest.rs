//! Manifest parsing for pmpsdb configuration files
//!
//! A manifest is one configuration file. Two shapes are accepted:
//!
//! - the full TOML/YAML layout with `[defaults]`, `[engine]` and `[[hosts]]`
//! - the legacy YAML mapping of PLC hostname to IOC prefix, as shipped per
//!   beamline in `pmpsdb_<group>.yml` files
//!
//! Multiple manifests are merged into a resolved configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pmps_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::reconcile::{CompareMode, TieBreak};

/// How hosts are reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Ssh,
    /// Each host's share is mounted under a local root directory.
    Mount,
}

/// Conventions shared by every host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub remote_path: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<TransportKind>,
    /// Mount transport: hosts live at `<mount_root>/<hostname>`.
    pub mount_root: Option<PathBuf>,
    pub identity_file: Option<PathBuf>,
    /// Extra `ssh -o` options, e.g. `StrictHostKeyChecking=no`.
    pub ssh_options: Vec<String>,
}

/// Engine behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub compare: Option<CompareMode>,
    pub tie_break: Option<TieBreak>,
    pub timeout_secs: Option<u64>,
    pub max_concurrent_hosts: Option<usize>,
    pub verify_writes: Option<bool>,
    /// Regex restricting which file names are reconciled.
    pub include: Option<String>,
    /// Local directory holding database exports.
    pub export_dir: Option<PathBuf>,
}

/// One configured PLC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEntry {
    pub hostname: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub remote_path: Option<String>,
    #[serde(default)]
    pub ioc_prefix: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl HostEntry {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            address: None,
            remote_path: None,
            ioc_prefix: None,
            groups: Vec::new(),
        }
    }
}

/// Configuration parsed from a single file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

impl Manifest {
    /// Parse a manifest from TOML content
    ///
    /// ```
    /// use pmps_core::config::Manifest;
    ///
    /// let manifest = Manifest::parse(r#"
    /// [defaults]
    /// remote_path = "/Hard Disk/ftp/pmps"
    ///
    /// [[hosts]]
    /// hostname = "plc-tst-motion"
    /// groups = ["tst"]
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.hosts[0].hostname, "plc-tst-motion");
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::InvalidConfig { message: e.to_string() })
    }

    /// Load a manifest from disk, accepting the legacy hostname mapping for
    /// YAML files.
    pub fn load(path: &Path) -> Result<Self> {
        let store = ConfigStore::new();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );
        if is_yaml {
            if let Ok(legacy) = store.load::<BTreeMap<String, String>>(path) {
                tracing::debug!(path = %path.display(), hosts = legacy.len(), "Loaded legacy host mapping");
                return Ok(Self::from_legacy(legacy, legacy_group(path)));
            }
        }
        Ok(store.load(path)?)
    }

    /// Build a manifest from a `hostname: IOC_PREFIX` mapping.
    pub fn from_legacy(mapping: BTreeMap<String, String>, group: Option<String>) -> Self {
        let hosts = mapping
            .into_iter()
            .map(|(hostname, prefix)| HostEntry {
                ioc_prefix: Some(prefix),
                groups: group.iter().cloned().collect(),
                ..HostEntry::new(hostname)
            })
            .collect();
        Self {
            hosts,
            ..Self::default()
        }
    }

    /// Merge another manifest into this one
    ///
    /// Values set in `other` win. Hosts are matched by hostname; a later
    /// entry replaces an earlier one in place, new hosts are appended.
    pub fn merge(&mut self, other: &Manifest) {
        let d = &other.defaults;
        merge_opt(&mut self.defaults.remote_path, &d.remote_path);
        merge_opt(&mut self.defaults.user, &d.user);
        merge_opt(&mut self.defaults.port, &d.port);
        merge_opt(&mut self.defaults.transport, &d.transport);
        merge_opt(&mut self.defaults.mount_root, &d.mount_root);
        merge_opt(&mut self.defaults.identity_file, &d.identity_file);
        for option in &d.ssh_options {
            if !self.defaults.ssh_options.contains(option) {
                self.defaults.ssh_options.push(option.clone());
            }
        }

        let e = &other.engine;
        merge_opt(&mut self.engine.compare, &e.compare);
        merge_opt(&mut self.engine.tie_break, &e.tie_break);
        merge_opt(&mut self.engine.timeout_secs, &e.timeout_secs);
        merge_opt(&mut self.engine.max_concurrent_hosts, &e.max_concurrent_hosts);
        merge_opt(&mut self.engine.verify_writes, &e.verify_writes);
        merge_opt(&mut self.engine.include, &e.include);
        merge_opt(&mut self.engine.export_dir, &e.export_dir);

        for host in &other.hosts {
            match self.hosts.iter_mut().find(|h| h.hostname == host.hostname) {
                Some(existing) => *existing = host.clone(),
                None => self.hosts.push(host.clone()),
            }
        }
    }
}

fn merge_opt<T: Clone>(base: &mut Option<T>, overlay: &Option<T>) {
    if overlay.is_some() {
        base.clone_from(overlay);
    }
}

/// `pmpsdb_lfe.yml` belongs to group `lfe`.
fn legacy_group(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("pmpsdb_").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_full_manifest() {
        let manifest = Manifest::parse(
            r#"
[defaults]
remote_path = "/Hard Disk/ftp/pmps"
user = "Administrator"
transport = "mount"
mount_root = "/mnt/plc"

[engine]
compare = "size-first"
tie_break = "remote"
timeout_secs = 30

[[hosts]]
hostname = "plc-tst-motion"
address = "172.21.0.10"
ioc_prefix = "PLC:TST:MOT"
groups = ["tst"]
"#,
        )
        .unwrap();

        assert_eq!(manifest.defaults.transport, Some(TransportKind::Mount));
        assert_eq!(manifest.engine.compare, Some(CompareMode::SizeFirst));
        assert_eq!(manifest.engine.tie_break, Some(TieBreak::PreferRemote));
        assert_eq!(manifest.hosts[0].address.as_deref(), Some("172.21.0.10"));
    }

    #[test]
    fn merge_overrides_scalars_and_replaces_hosts_by_name() {
        let mut base = Manifest::parse(
            r#"
[defaults]
remote_path = "/a"
port = 22

[[hosts]]
hostname = "plc-1"
ioc_prefix = "OLD"

[[hosts]]
hostname = "plc-2"
"#,
        )
        .unwrap();
        let overlay = Manifest::parse(
            r#"
[defaults]
remote_path = "/b"

[[hosts]]
hostname = "plc-1"
ioc_prefix = "NEW"

[[hosts]]
hostname = "plc-3"
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.defaults.remote_path.as_deref(), Some("/b"));
        assert_eq!(base.defaults.port, Some(22));
        let names: Vec<_> = base.hosts.iter().map(|h| h.hostname.as_str()).collect();
        assert_eq!(names, vec!["plc-1", "plc-2", "plc-3"]);
        assert_eq!(base.hosts[0].ioc_prefix.as_deref(), Some("NEW"));
    }

    #[test]
    fn legacy_yaml_mapping_takes_group_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmpsdb_lfe.yml");
        std::fs::write(&path, "plc-lfe-motion: PLC:LFE:MOTION\nplc-lfe-vac: PLC:LFE:VAC\n").unwrap();

        let manifest = Manifest::load(&path).unwrap();

        assert_eq!(manifest.hosts.len(), 2);
        assert_eq!(manifest.hosts[0].hostname, "plc-lfe-motion");
        assert_eq!(manifest.hosts[0].ioc_prefix.as_deref(), Some("PLC:LFE:MOTION"));
        assert_eq!(manifest.hosts[0].groups, vec!["lfe".to_string()]);
    }

    #[test]
    fn yaml_manifest_is_not_mistaken_for_legacy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.yaml");
        std::fs::write(
            &path,
            "defaults:\n  remote_path: /pmps\nhosts:\n  - hostname: plc-kfe-gatt\n    groups: [kfe]\n",
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();

        assert_eq!(manifest.defaults.remote_path.as_deref(), Some("/pmps"));
        assert_eq!(manifest.hosts[0].groups, vec!["kfe".to_string()]);
    }
}
