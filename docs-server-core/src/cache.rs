//! In-memory store of downloaded file bytes for the proxy path.
//!
//! Content at a given `(version, file)` is treated as immutable once fetched, so
//! entries are never invalidated or evicted. The cache is unbounded; see DESIGN.md.
//!
//! The cache does no I/O. Callers do the read-through themselves: look up, on a
//! miss download from the provider, then [`ContentCache::set`] before returning
//! (see [`crate::service::DocsService::get_file`]).

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct ContentCache {
    // version -> file -> bytes; nested so lookups need no owned key.
    entries: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: &str, file: &str) -> Option<Bytes> {
        self.entries
            .read()
            .get(version)
            .and_then(|files| files.get(file))
            .cloned()
    }

    /// Store `data`, overwriting any previous value.
    pub fn set(&self, version: &str, file: &str, data: Bytes) {
        self.entries
            .write()
            .entry(version.to_owned())
            .or_default()
            .insert(file.to_owned(), data);
    }

    /// Number of cached files across all versions.
    pub fn len(&self) -> usize {
        self.entries.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
