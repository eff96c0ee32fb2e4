//! Point-in-time view of the local source directory

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pmps_fs::{DirListing, Fingerprint, fingerprint_file, list_dir};

use super::FileSelection;
use crate::model::{ErrorRecord, FileRecord};

#[derive(Debug)]
enum LocalState {
    Fingerprinted(Fingerprint),
    Unreadable(pmps_fs::Error),
}

#[derive(Debug)]
struct LocalFile {
    size: u64,
    modified_at: Option<DateTime<Utc>>,
    state: LocalState,
}

/// The selected local files, listed and fingerprinted once per run.
///
/// Every host of a run is reconciled against the same snapshot, so a file
/// pulled from one host never changes what another host is compared with.
#[derive(Debug)]
pub struct LocalSnapshot {
    dir: PathBuf,
    files: BTreeMap<String, LocalFile>,
}

impl LocalSnapshot {
    /// List and fingerprint the files of `dir` that `selection` matches.
    ///
    /// Blocks on local I/O. Fails only when `dir` itself cannot be listed;
    /// a file that cannot be inspected or read is kept as unreadable.
    pub fn capture(dir: &Path, selection: &FileSelection) -> pmps_fs::Result<Self> {
        let DirListing { entries, unreadable } = list_dir(dir)?;

        let mut files = BTreeMap::new();
        for entry in entries.into_iter().filter(|e| selection.matches(&e.name)) {
            let state = match fingerprint_file(&dir.join(&entry.name)) {
                Ok(fingerprint) => LocalState::Fingerprinted(fingerprint),
                Err(e) => {
                    tracing::warn!(file = %entry.name, error = %e, "local file unreadable");
                    LocalState::Unreadable(e)
                }
            };
            let file = LocalFile {
                size: entry.size,
                modified_at: entry.modified_at,
                state,
            };
            files.insert(entry.name, file);
        }
        for bad in unreadable.into_iter().filter(|u| selection.matches(&u.name)) {
            let file = LocalFile {
                size: 0,
                modified_at: None,
                state: LocalState::Unreadable(bad.error),
            };
            files.insert(bad.name, file);
        }

        tracing::debug!(dir = %dir.display(), files = files.len(), "local snapshot taken");
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot file names in lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn is_unreadable(&self, name: &str) -> bool {
        matches!(
            self.files.get(name).map(|f| &f.state),
            Some(LocalState::Unreadable(_))
        )
    }

    /// Listing-only record for `name`, marked unreadable when it is.
    pub fn listed(&self, name: &str) -> Option<FileRecord> {
        let file = self.files.get(name)?;
        let record = FileRecord::listed(name, file.size, file.modified_at);
        Some(match file.state {
            LocalState::Fingerprinted(_) => record,
            LocalState::Unreadable(_) => record.into_unreadable(),
        })
    }

    /// Content record for `name`. `None` when absent or unreadable.
    pub fn fingerprinted(&self, name: &str) -> Option<FileRecord> {
        let file = self.files.get(name)?;
        match &file.state {
            LocalState::Fingerprinted(fingerprint) => {
                Some(FileRecord::fingerprinted(name, *fingerprint, file.modified_at))
            }
            LocalState::Unreadable(_) => None,
        }
    }

    /// Error record for `name` if its local copy is unreadable.
    pub fn error_for(&self, host: &str, name: &str) -> Option<ErrorRecord> {
        match &self.files.get(name)?.state {
            LocalState::Fingerprinted(_) => None,
            LocalState::Unreadable(e) => Some(ErrorRecord::from_fs(host, Some(name), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_capture_fingerprints_selected_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "a").unwrap();
        fs::write(dir.path().join("b.dbd"), "b").unwrap();

        let selection = FileSelection::all().with_pattern(r"\.json$").unwrap();
        let snapshot = LocalSnapshot::capture(dir.path(), &selection).unwrap();

        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["a.json"]);
        let record = snapshot.fingerprinted("a.json").unwrap();
        assert!(record.digest().is_some());
        assert!(snapshot.fingerprinted("b.dbd").is_none());
    }

    #[test]
    fn test_snapshot_ignores_later_changes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "before").unwrap();
        let snapshot = LocalSnapshot::capture(dir.path(), &FileSelection::all()).unwrap();
        let before = snapshot.fingerprinted("a.json").unwrap();

        fs::write(dir.path().join("a.json"), "after, and longer").unwrap();
        fs::write(dir.path().join("b.json"), "new").unwrap();

        assert_eq!(snapshot.fingerprinted("a.json").unwrap(), before);
        assert!(!snapshot.contains("b.json"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_unreadable() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("stale.dbd")).unwrap();

        let snapshot = LocalSnapshot::capture(dir.path(), &FileSelection::all()).unwrap();

        assert!(snapshot.is_unreadable("stale.dbd"));
        assert!(snapshot.listed("stale.dbd").unwrap().is_unreadable());
        assert!(snapshot.fingerprinted("stale.dbd").is_none());
        let error = snapshot.error_for("plc-a", "stale.dbd").unwrap();
        assert_eq!(error.kind, ErrorKind::LocalIo);
        assert_eq!(error.file_name.as_deref(), Some("stale.dbd"));
    }

    #[test]
    fn test_missing_dir_fails_capture() {
        let dir = tempdir().unwrap();
        assert!(LocalSnapshot::capture(&dir.path().join("missing"), &FileSelection::all()).is_err());
    }
}
