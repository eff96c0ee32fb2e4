//! Transport over a locally mounted PLC share
//!
//! The remote directory is resolved under `root`, so a host configured with
//! `remote_path = "/Hard Disk/ftp/pmps"` and mounted at `/mnt/plc-tst` is
//! read from `/mnt/plc-tst/Hard Disk/ftp/pmps`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::transport::{RemoteEntry, Transport};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct MountTransport {
    host: String,
    root: PathBuf,
    connected: bool,
}

impl MountTransport {
    pub fn new(host: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            root: root.into(),
            connected: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, dir: &str) -> PathBuf {
        self.root.join(dir.trim_start_matches('/'))
    }

    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {
                self.connected = true;
                Ok(())
            }
            Ok(_) => Err(Error::unreachable(
                &self.host,
                format!("mount root {} is not a directory", self.root.display()),
            )),
            Err(e) => Err(Error::unreachable(
                &self.host,
                format!("mount root {}: {e}", self.root.display()),
            )),
        }
    }
}

#[async_trait]
impl Transport for MountTransport {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list(&mut self, dir: &str) -> Result<Vec<RemoteEntry>> {
        self.connect().await?;
        let path = self.resolve(dir);
        let not_found = || Error::PathNotFound {
            host: self.host.clone(),
            path: dir.to_string(),
        };

        let mut reader = tokio::fs::read_dir(&path).await.map_err(|_| not_found())?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|_| not_found())? {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            entries.push(RemoteEntry {
                name,
                size: meta.len(),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&mut self, dir: &str, name: &str) -> Result<Vec<u8>> {
        self.connect().await?;
        let path = self.resolve(dir).join(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| Error::incomplete(&self.host, name, e.to_string()))
    }

    async fn put(&mut self, dir: &str, name: &str, content: &[u8]) -> Result<u64> {
        self.connect().await?;
        let path = self.resolve(dir).join(name);
        let write_err = |e: std::io::Error| Error::write_failed(&self.host, name, e.to_string());

        let mut file = tokio::fs::File::create(&path).await.map_err(write_err)?;
        file.write_all(content).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        let meta = tokio::fs::metadata(&path).await.map_err(write_err)?;
        Ok(meta.len())
    }

    async fn rename(&mut self, dir: &str, from: &str, to: &str) -> Result<()> {
        self.connect().await?;
        let base = self.resolve(dir);
        tokio::fs::rename(base.join(from), base.join(to))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::write_failed(&self.host, to, format!("{from} vanished before rename")),
                _ => Error::write_failed(&self.host, to, e.to_string()),
            })
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::temp_name;
    use pretty_assertions::assert_eq;

    const DIR: &str = "/Hard Disk/ftp/pmps";

    fn share() -> (tempfile::TempDir, MountTransport) {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("Hard Disk/ftp/pmps")).unwrap();
        let transport = MountTransport::new("plc-tst-motion", root.path());
        (root, transport)
    }

    #[tokio::test]
    async fn lists_only_regular_files_sorted() {
        let (root, mut transport) = share();
        let db = root.path().join("Hard Disk/ftp/pmps");
        std::fs::write(db.join("b.json"), "bb").unwrap();
        std::fs::write(db.join("a.json"), "a").unwrap();
        std::fs::create_dir(db.join("archive")).unwrap();

        let entries = transport.list(DIR).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.size)).collect();

        assert_eq!(names, vec![("a.json", 1), ("b.json", 2)]);
        assert!(entries.iter().all(|e| e.modified_at.is_some()));
    }

    #[tokio::test]
    async fn missing_directory_is_path_not_found() {
        let (_root, mut transport) = share();
        let err = transport.list("/Hard Disk/ftp/missing").await.unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }));
    }

    #[tokio::test]
    async fn missing_root_is_unreachable() {
        let mut transport = MountTransport::new("plc-gone", "/nonexistent/pmpsdb-mount");
        let err = transport.list(DIR).await.unwrap_err();
        assert!(err.is_connection_loss());
    }

    #[tokio::test]
    async fn write_replaces_target_and_removes_temp() {
        let (root, mut transport) = share();
        let db = root.path().join("Hard Disk/ftp/pmps");
        std::fs::write(db.join("plc-tst-motion.json"), "old").unwrap();

        transport.write(DIR, "plc-tst-motion.json", b"{\"new\": 1}").await.unwrap();

        assert_eq!(std::fs::read(db.join("plc-tst-motion.json")).unwrap(), b"{\"new\": 1}");
        assert!(!db.join(temp_name("plc-tst-motion.json")).exists());
        assert_eq!(transport.read(DIR, "plc-tst-motion.json").await.unwrap(), b"{\"new\": 1}");
    }

    #[tokio::test]
    async fn read_of_missing_file_is_incomplete() {
        let (_root, mut transport) = share();
        let err = transport.read(DIR, "nope.json").await.unwrap_err();
        assert!(matches!(err, Error::IncompleteRead { .. }));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_root, mut transport) = share();
        transport.close().await.unwrap();
        transport.list(DIR).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }
}
