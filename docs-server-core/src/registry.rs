//! The documentation registry: which versions are mirrored and which files each one has.
//!
//! The registry is the single source of truth read by serving code. It is written
//! only by the reconciler and read by any number of concurrent tasks.
//!
//! Locking is exclusive-write/shared-read over the whole table. Entries are stored
//! as `Arc<DocumentationEntry>` and replaced wholesale, so a reader holding an
//! entry always sees one consistent file list, either from before or after an
//! upsert. No lock is ever held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// One mirrored version and its logical file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentationEntry {
    /// The version of this documentation, e.g. a tag name.
    pub version: String,
    /// Logical file names, prefix and suffix already stripped.
    pub files: Vec<String>,
}

impl DocumentationEntry {
    pub fn has_file(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Arc<DocumentationEntry>>,
    // Discovery order, for deterministic listing.
    order: Vec<String>,
}

/// Concurrency-safe `version -> files` table.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point lookup.
    pub fn get(&self, version: &str) -> Option<Arc<DocumentationEntry>> {
        self.inner.read().entries.get(version).cloned()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.inner.read().entries.contains_key(version)
    }

    /// Versions currently held, in discovery order.
    pub fn list_versions(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// All entries in discovery order.
    pub fn snapshot(&self) -> Vec<Arc<DocumentationEntry>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|v| inner.entries.get(v).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the file list for `version`, creating the entry if absent.
    ///
    /// A version that already exists keeps its listing position.
    pub fn upsert(&self, version: impl Into<String>, files: Vec<String>) {
        let version = version.into();
        let entry = Arc::new(DocumentationEntry {
            version: version.clone(),
            files,
        });

        let mut inner = self.inner.write();
        if inner.entries.insert(version.clone(), entry).is_none() {
            inner.order.push(version.clone());
            debug!(version = %version, "Registered new documentation version");
        } else {
            debug!(version = %version, "Replaced documentation version");
        }
    }

    /// Delete `version` if present. Returns whether anything was removed.
    pub fn remove(&self, version: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.entries.remove(version).is_none() {
            return false;
        }
        inner.order.retain(|v| v != version);
        debug!(version = %version, "Removed documentation version");
        true
    }
}
