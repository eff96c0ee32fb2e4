//! Restricting a run to a subset of file names

use regex::Regex;

use crate::{Error, Result};

/// Which file names a run considers.
///
/// An empty selection takes every name. Explicit names and the pattern are
/// alternatives: a name is selected when it is listed or matches.
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    names: Vec<String>,
    pattern: Option<Regex>,
}

impl FileSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidConfig {
            message: format!("file pattern {pattern:?}: {e}"),
        })?;
        self.pattern = Some(regex);
        Ok(self)
    }

    pub fn is_all(&self) -> bool {
        self.names.is_empty() && self.pattern.is_none()
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.is_all() {
            return true;
        }
        self.names.iter().any(|n| n == name) || self.pattern.as_ref().is_some_and(|p| p.is_match(name))
    }

    /// Explicitly named files, for reporting names neither side has.
    pub fn explicit_names(&self) -> &[String] {
        &self.names
    }
}
