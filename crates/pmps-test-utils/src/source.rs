//! [`SourceDir`] builder for the local source-of-truth directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

/// A temporary export directory with helpers for seeding and inspecting
/// database files.
///
/// # Example
///
/// ```rust,no_run
/// use pmps_test_utils::SourceDir;
///
/// let source = SourceDir::new();
/// source.write("plc-tst-motion.json", "{}");
/// source.assert_contents("plc-tst-motion.json", "{}");
/// ```
pub struct SourceDir {
    temp_dir: TempDir,
}

impl Default for SourceDir {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) {
        fs::write(self.file_path(name), content).unwrap();
    }

    /// Write a file and pin its modification time.
    pub fn write_at(&self, name: &str, content: impl AsRef<[u8]>, modified_at: DateTime<Utc>) {
        self.write(name, content);
        let file = fs::File::options().write(true).open(self.file_path(name)).unwrap();
        file.set_modified(SystemTime::from(modified_at)).unwrap();
    }

    pub fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.file_path(name))
            .unwrap_or_else(|_| panic!("Could not read file: {}", self.file_path(name).display()))
    }

    pub fn modified_at(&self, name: &str) -> DateTime<Utc> {
        let modified = fs::metadata(self.file_path(name)).unwrap().modified().unwrap();
        DateTime::<Utc>::from(modified)
    }

    /// Assert that `name` holds exactly `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or differs.
    pub fn assert_contents(&self, name: &str, content: impl AsRef<[u8]>) {
        let actual = self.read(name);
        assert!(
            actual == content.as_ref(),
            "Unexpected content in {}: {:?}",
            self.file_path(name).display(),
            String::from_utf8_lossy(&actual)
        );
    }
}
