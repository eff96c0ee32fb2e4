//! In-memory PLC hosts
//!
//! A [`MemoryHost`] is shared state standing in for one PLC's database
//! directory. Tests keep a handle to it to seed files, inject faults and
//! inspect the result, while the engine talks to it through
//! [`MemoryTransport`] sessions created by [`MemoryConnector`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmps_core::{Connector, HostDescriptor};
use pmps_transport::{Error, RemoteEntry, Result, Transport};

#[derive(Debug, Clone)]
struct MemoryFile {
    content: Vec<u8>,
    modified_at: Option<DateTime<Utc>>,
}

/// Operation counters, for asserting what the engine did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub lists: usize,
    pub reads: usize,
    pub puts: usize,
    pub renames: usize,
    pub closes: usize,
}

#[derive(Debug, Default)]
struct HostState {
    files: BTreeMap<String, MemoryFile>,
    unreachable: bool,
    missing_dir: bool,
    truncated_reads: HashSet<String>,
    rejected_confirms: HashSet<String>,
    fail_renames: bool,
    delay: Option<Duration>,
    stats: MemoryStats,
}

/// Shared state of one simulated PLC.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap()
    }

    /// Seed a file with no timestamp.
    pub fn with_file(self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.put_file(name, content, None);
        self
    }

    pub fn put_file(&self, name: &str, content: impl Into<Vec<u8>>, modified_at: Option<DateTime<Utc>>) {
        self.state().files.insert(
            name.to_string(),
            MemoryFile {
                content: content.into(),
                modified_at,
            },
        );
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.state().files.get(name).map(|f| f.content.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    pub fn stats(&self) -> MemoryStats {
        self.state().stats
    }

    /// Every operation fails with `HostUnreachable`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Listing fails with `PathNotFound`.
    pub fn set_missing_dir(&self, missing: bool) {
        self.state().missing_dir = missing;
    }

    /// Reads of `name` end early with `IncompleteRead`.
    pub fn truncate_reads_of(&self, name: &str) {
        self.state().truncated_reads.insert(name.to_string());
    }

    /// Uploads to the temporary name for `name` confirm one byte short.
    pub fn reject_confirm_of(&self, name: &str) {
        self.state().rejected_confirms.insert(name.to_string());
    }

    pub fn set_fail_renames(&self, fail: bool) {
        self.state().fail_renames = fail;
    }

    /// Sleep before every operation.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state().delay = delay;
    }
}

/// One session to a [`MemoryHost`].
#[derive(Debug)]
pub struct MemoryTransport {
    hostname: String,
    host: MemoryHost,
}

impl MemoryTransport {
    pub fn new(hostname: impl Into<String>, host: MemoryHost) -> Self {
        Self {
            hostname: hostname.into(),
            host,
        }
    }

    /// Apply the configured delay and connectivity fault.
    async fn enter(&self) -> Result<()> {
        let delay = self.host.state().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.host.state().unreachable {
            return Err(Error::unreachable(&self.hostname, "simulated connection failure"));
        }
        Ok(())
    }

    /// The target name a temporary upload name belongs to.
    fn target_of(temp: &str) -> &str {
        temp.strip_prefix('.')
            .and_then(|rest| rest.strip_suffix(pmps_transport::TEMP_SUFFIX))
            .unwrap_or(temp)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn host(&self) -> &str {
        &self.hostname
    }

    async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>> {
        self.enter().await?;
        let mut state = self.host.state();
        state.stats.lists += 1;
        if state.missing_dir {
            return Err(Error::PathNotFound {
                host: self.hostname.clone(),
                path: dir.to_string(),
            });
        }
        Ok(state
            .files
            .iter()
            .map(|(name, file)| RemoteEntry {
                name: name.clone(),
                size: file.content.len() as u64,
                modified_at: file.modified_at,
            })
            .collect())
    }

    async fn read(&mut self, _dir: &str, name: &str) -> Result<Vec<u8>> {
        self.enter().await?;
        let mut state = self.host.state();
        state.stats.reads += 1;
        if state.truncated_reads.contains(name) {
            return Err(Error::incomplete(&self.hostname, name, "simulated truncated transfer"));
        }
        state
            .files
            .get(name)
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::incomplete(&self.hostname, name, "no such file"))
    }

    async fn put(&mut self, _dir: &str, name: &str, content: &[u8]) -> Result<u64> {
        self.enter().await?;
        let mut state = self.host.state();
        state.stats.puts += 1;
        let keep = if state.rejected_confirms.contains(Self::target_of(name)) {
            content.len().saturating_sub(1)
        } else {
            content.len()
        };
        state.files.insert(
            name.to_string(),
            MemoryFile {
                content: content[..keep].to_vec(),
                modified_at: Some(Utc::now()),
            },
        );
        Ok(keep as u64)
    }

    async fn rename(&mut self, _dir: &str, from: &str, to: &str) -> Result<()> {
        self.enter().await?;
        let mut state = self.host.state();
        state.stats.renames += 1;
        if state.fail_renames {
            return Err(Error::write_failed(&self.hostname, to, "simulated rename failure"));
        }
        let file = state
            .files
            .remove(from)
            .ok_or_else(|| Error::write_failed(&self.hostname, to, format!("{from} does not exist")))?;
        state.files.insert(to.to_string(), file);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.host.state().stats.closes += 1;
        Ok(())
    }
}

/// Hands out [`MemoryTransport`] sessions by hostname.
///
/// Hosts not registered here fail to connect with `HostUnreachable`.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    hosts: HashMap<String, MemoryHost>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, hostname: &str, host: MemoryHost) -> Self {
        self.hosts.insert(hostname.to_string(), host);
        self
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, host: &HostDescriptor) -> Result<Box<dyn Transport>> {
        let memory = self
            .hosts
            .get(&host.hostname)
            .cloned()
            .ok_or_else(|| Error::unreachable(&host.hostname, "no such host"))?;
        Ok(Box::new(MemoryTransport::new(&host.hostname, memory)))
    }
}
