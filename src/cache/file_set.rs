//! Bounded path-set → checksum cache.
//!
//! Remembers which checksum a requested path set produced so the whole
//! pipeline is skipped on repeat requests. Capacity is fixed; once exceeded
//! the least recently *inserted* entry is evicted (lookups never promote) and
//! the registered [`EvictionListener`] is told, which is how the aggregate
//! store stays bounded by this cache's capacity.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::domain::Checksum;

use super::keys::FileSetKey;
use super::lock::{rw_read, rw_write};
use super::store::ENTRY_OVERHEAD_BYTES;

const SOURCE: &str = "cache::file_set";
const METRIC_FILE_SET_EVICT: &str = "collate_file_set_evict_total";

/// Callback invoked synchronously when a bounded cache drops an entry.
///
/// Runs while the evicting cache holds its own write lock. Implementations
/// may take locks that rank *after* that cache, never before it.
pub trait EvictionListener<K, V>: Send + Sync {
    fn on_eviction(&self, key: &K, value: &V);
}

struct Entries {
    map: LruCache<FileSetKey, Checksum>,
    // Number of live keys per checksum; identical content from different
    // path sets shares one artifact.
    references: HashMap<Checksum, usize>,
}

impl Entries {
    fn retain(&mut self, checksum: &Checksum) {
        *self.references.entry(checksum.clone()).or_insert(0) += 1;
    }

    /// Returns true when `checksum` lost its last reference.
    fn release(&mut self, checksum: &Checksum) -> bool {
        match self.references.get_mut(checksum) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.references.remove(checksum);
                true
            }
            None => true,
        }
    }
}

pub struct FileSetCache {
    entries: RwLock<Entries>,
    capacity: NonZeroUsize,
    listener: Arc<dyn EvictionListener<FileSetKey, Checksum>>,
}

impl FileSetCache {
    pub fn new(
        capacity: NonZeroUsize,
        listener: Arc<dyn EvictionListener<FileSetKey, Checksum>>,
    ) -> Self {
        Self {
            entries: RwLock::new(Entries {
                // Sized by hand: `LruCache::new` would evict on `push` itself,
                // and we need the displaced entry to run the listener.
                map: LruCache::unbounded(),
                references: HashMap::new(),
            }),
            capacity,
            listener,
        }
    }

    /// Look up the checksum for `key` without touching eviction order.
    pub fn get(&self, key: &FileSetKey) -> Option<Checksum> {
        rw_read(&self.entries, SOURCE, "get").map.peek(key).cloned()
    }

    /// Record `checksum` for `key`, evicting the oldest entries beyond
    /// capacity. Returns the keys that were evicted.
    pub fn insert(&self, key: FileSetKey, checksum: Checksum) -> Vec<FileSetKey> {
        let mut entries = rw_write(&self.entries, SOURCE, "insert");

        if entries.map.peek(&key) == Some(&checksum) {
            return Vec::new();
        }

        entries.retain(&checksum);
        if let Some(previous) = entries.map.push(key, checksum) {
            // Same key re-inserted with different content.
            self.release(&mut entries, &previous.0, &previous.1);
        }

        let mut evicted = Vec::new();
        while entries.map.len() > self.capacity.get() {
            let Some((key, checksum)) = entries.map.pop_lru() else {
                break;
            };
            counter!(METRIC_FILE_SET_EVICT).increment(1);
            let orphaned = self.release(&mut entries, &key, &checksum);
            debug!(
                checksum = %checksum,
                paths = key.paths.len(),
                theme = %key.theme,
                orphaned,
                "Evicted file-set cache entry"
            );
            evicted.push(key);
        }
        evicted
    }

    /// Drop one reference to `checksum`, notifying the listener when it was
    /// the last.
    fn release(&self, entries: &mut Entries, key: &FileSetKey, checksum: &Checksum) -> bool {
        let orphaned = entries.release(checksum);
        if orphaned {
            self.listener.on_eviction(key, checksum);
        }
        orphaned
    }

    /// Drop every entry without notifying the listener.
    pub fn clear(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        entries.map.clear();
        entries.references.clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn approximate_bytes(&self) -> usize {
        rw_read(&self.entries, SOURCE, "size")
            .map
            .iter()
            .map(|(key, checksum)| {
                key.approximate_bytes() + checksum.as_str().len() + ENTRY_OVERHEAD_BYTES
            })
            .sum()
    }
}
