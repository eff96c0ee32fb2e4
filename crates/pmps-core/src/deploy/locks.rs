//! Per-file-name mutual exclusion on the local directory

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One async mutex per local file name, created on demand.
///
/// Host tasks pulling the same name take turns; different names proceed in
/// parallel.
#[derive(Debug, Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }
}
