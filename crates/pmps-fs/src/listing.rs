//! Listing of the local source-of-truth directory

use std::fs;
use std::path::Path;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Metadata for one regular file in a local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntry {
    pub name: String,
    /// Size reported by metadata. Not authoritative for comparisons.
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Hidden names are never reconciled.
///
/// Covers dotfiles as well as the temporary artifacts left by atomic writes
/// on either side.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Drop sub-second precision. Remote listings only carry whole seconds.
pub fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    time.with_nanosecond(0).unwrap_or(time)
}

/// A name in the directory whose metadata could not be read.
#[derive(Debug)]
pub struct UnreadableEntry {
    pub name: String,
    pub error: Error,
}

/// Result of listing a local directory.
#[derive(Debug, Default)]
pub struct DirListing {
    pub entries: Vec<LocalEntry>,
    /// Names that could not be inspected, such as dangling symlinks.
    pub unreadable: Vec<UnreadableEntry>,
}

/// List the regular, non-hidden files in `dir`, sorted by name.
///
/// Sub-directories and symlinks to directories are skipped. Names that are
/// not valid UTF-8 are skipped with a warning since they can never match a
/// remote name. Only a missing or unreadable `dir` is an error; a failure on
/// a single entry lands in [`DirListing::unreadable`].
pub fn list_dir(dir: &Path) -> Result<DirListing> {
    let meta = fs::metadata(dir).map_err(|e| Error::io(dir, e))?;
    if !meta.is_dir() {
        return Err(Error::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut listing = DirListing::default();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        if is_hidden(&name) {
            continue;
        }
        let path = entry.path();
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot inspect local file");
                listing.unreadable.push(UnreadableEntry {
                    name,
                    error: Error::io(&path, e),
                });
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        listing.entries.push(LocalEntry {
            name,
            size: meta.len(),
            modified_at: meta
                .modified()
                .ok()
                .map(|t| truncate_to_seconds(DateTime::<Utc>::from(t))),
        });
    }

    listing.entries.sort_by(|a, b| a.name.cmp(&b.name));
    listing.unreadable.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("plc-tst-motion.json", false)]
    #[case(".plc-tst-motion.json.pmpsdb-tmp", true)]
    #[case(".DS_Store", true)]
    #[case("a.dbd.", false)]
    fn hidden_names(#[case] name: &str, #[case] hidden: bool) {
        assert_eq!(is_hidden(name), hidden);
    }

    #[test]
    fn lists_files_sorted_and_skips_hidden_and_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "bb").unwrap();
        fs::write(dir.path().join("a.json"), "a").unwrap();
        fs::write(dir.path().join(".a.json.123.tmp"), "partial").unwrap();
        fs::create_dir(dir.path().join("archive")).unwrap();

        let entries = list_dir(dir.path()).unwrap().entries;
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(entries[1].size, 2);
        assert_eq!(entries[0].modified_at.unwrap().nanosecond(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_unreadable_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.dbd"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.dbd"), dir.path().join("stale.dbd")).unwrap();

        let listing = list_dir(dir.path()).unwrap();

        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].name, "a.dbd");
        assert_eq!(listing.unreadable.len(), 1);
        assert_eq!(listing.unreadable[0].name, "stale.dbd");
        assert!(matches!(listing.unreadable[0].error, Error::Io { .. }));
    }

    #[test]
    fn missing_dir_is_io_error() {
        let dir = tempdir().unwrap();
        let err = list_dir(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn file_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.json");
        fs::write(&file, "x").unwrap();
        assert!(matches!(list_dir(&file).unwrap_err(), Error::NotADirectory { .. }));
    }
}
