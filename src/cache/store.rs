//! Unbounded cache storage.
//!
//! Per-file: resolved or compressed text of one resource.
//! Aggregate: combined artifacts addressed by checksum.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::{AggregateArtifact, Checksum};

use super::file_set::EvictionListener;
use super::keys::{FileKey, FileSetKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Approximate per-entry bookkeeping overhead used by size reports.
pub(crate) const ENTRY_OVERHEAD_BYTES: usize = 64;

// ============================================================================
// Per-file cache
// ============================================================================

/// Memoized single-file text for one content kind.
///
/// Entries live until [`FileCache::clear`]; underlying resources are assumed
/// immutable for the life of the process.
#[derive(Default)]
pub struct FileCache {
    entries: RwLock<HashMap<FileKey, Arc<str>>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FileKey) -> Option<Arc<str>> {
        rw_read(&self.entries, SOURCE, "file_get").get(key).cloned()
    }

    pub fn insert(&self, key: FileKey, content: impl Into<Arc<str>>) -> Arc<str> {
        let content = content.into();
        rw_write(&self.entries, SOURCE, "file_insert").insert(key, Arc::clone(&content));
        content
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "file_clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "file_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn approximate_bytes(&self) -> usize {
        rw_read(&self.entries, SOURCE, "file_size")
            .iter()
            .map(|(key, content)| key.approximate_bytes() + content.len() + ENTRY_OVERHEAD_BYTES)
            .sum()
    }
}

// ============================================================================
// Aggregate store
// ============================================================================

/// Checksum-addressed combined artifacts.
///
/// Has no eviction policy of its own: entries go when the file-set cache
/// evicts the last key pointing at them, or on [`AggregateStore::clear`].
#[derive(Default)]
pub struct AggregateStore {
    artifacts: RwLock<HashMap<Checksum, Arc<AggregateArtifact>>>,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, checksum: &Checksum) -> Option<Arc<AggregateArtifact>> {
        rw_read(&self.artifacts, SOURCE, "aggregate_get")
            .get(checksum)
            .cloned()
    }

    pub fn contains(&self, checksum: &Checksum) -> bool {
        rw_read(&self.artifacts, SOURCE, "aggregate_contains").contains_key(checksum)
    }

    pub fn insert(&self, checksum: Checksum, artifact: AggregateArtifact) {
        rw_write(&self.artifacts, SOURCE, "aggregate_insert").insert(checksum, Arc::new(artifact));
    }

    pub fn remove(&self, checksum: &Checksum) -> Option<Arc<AggregateArtifact>> {
        rw_write(&self.artifacts, SOURCE, "aggregate_remove").remove(checksum)
    }

    pub fn clear(&self) {
        rw_write(&self.artifacts, SOURCE, "aggregate_clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.artifacts, SOURCE, "aggregate_len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn approximate_bytes(&self) -> usize {
        rw_read(&self.artifacts, SOURCE, "aggregate_size")
            .iter()
            .map(|(checksum, artifact)| checksum.as_str().len() + artifact.stored_size())
            .sum()
    }
}

impl EvictionListener<FileSetKey, Checksum> for AggregateStore {
    /// Drops the artifact once no file set refers to it any more. Called with
    /// the file-set lock held, so this only ever takes the aggregate lock.
    fn on_eviction(&self, _key: &FileSetKey, checksum: &Checksum) {
        self.remove(checksum);
    }
}
