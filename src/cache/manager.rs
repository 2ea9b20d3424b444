//! Owner of every aggregation cache.
//!
//! Lock ranking, highest first: file-set slot, file-set entries, aggregate
//! store. Per-file caches are never held while another cache lock is taken.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::domain::{AggregateArtifact, Checksum, ContentKind};

use super::config::CacheConfig;
use super::file_set::FileSetCache;
use super::keys::FileSetKey;
use super::lock::{rw_read, rw_write};
use super::store::{AggregateStore, FileCache};

const SOURCE: &str = "cache::manager";

/// Size snapshot of one cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheReport {
    pub name: &'static str,
    pub entries: usize,
    pub approximate_bytes: usize,
}

pub struct CacheManager {
    config: CacheConfig,
    scripts: FileCache,
    stylesheets: FileCache,
    aggregates: Arc<AggregateStore>,
    // Built on first use and dropped again by `clear_all`.
    file_sets: RwLock<Option<FileSetCache>>,
    initialisations: AtomicUsize,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            scripts: FileCache::new(),
            stylesheets: FileCache::new(),
            aggregates: Arc::new(AggregateStore::new()),
            file_sets: RwLock::new(None),
            initialisations: AtomicUsize::new(0),
        }
    }

    /// Per-file cache for `kind`.
    pub fn files(&self, kind: ContentKind) -> &FileCache {
        match kind {
            ContentKind::Script => &self.scripts,
            ContentKind::Stylesheet => &self.stylesheets,
        }
    }

    pub fn aggregates(&self) -> &AggregateStore {
        &self.aggregates
    }

    /// Run `f` against the file-set cache, building it first if needed.
    ///
    /// Racing initialisers are serialised on the slot's write lock and the
    /// slot is checked again there, so exactly one instance is ever built.
    pub fn with_file_sets<R>(&self, f: impl FnOnce(&FileSetCache) -> R) -> R {
        {
            let slot = rw_read(&self.file_sets, SOURCE, "file_sets.read");
            if let Some(cache) = slot.as_ref() {
                return f(cache);
            }
        }

        let mut slot = rw_write(&self.file_sets, SOURCE, "file_sets.init");
        let cache = slot.get_or_insert_with(|| {
            self.initialisations.fetch_add(1, Ordering::SeqCst);
            debug!(
                capacity = self.config.file_set_cache_limit,
                "Initialised file-set cache"
            );
            FileSetCache::new(
                self.config.file_set_cache_limit_non_zero(),
                self.aggregates.clone(),
            )
        });
        f(cache)
    }

    /// How many times the file-set cache has been built.
    pub fn file_set_initialisations(&self) -> usize {
        self.initialisations.load(Ordering::SeqCst)
    }

    pub fn file_set_checksum(&self, key: &FileSetKey) -> Option<Checksum> {
        self.with_file_sets(|cache| cache.get(key))
    }

    pub fn remember_file_set(&self, key: FileSetKey, checksum: Checksum) -> Vec<FileSetKey> {
        self.with_file_sets(|cache| cache.insert(key, checksum))
    }

    pub fn store_artifact(&self, checksum: Checksum, artifact: AggregateArtifact) {
        self.aggregates.insert(checksum, artifact);
    }

    pub fn artifact(&self, checksum: &Checksum) -> Option<Arc<AggregateArtifact>> {
        self.aggregates.get(checksum)
    }

    /// Empty every cache. The file-set cache is rebuilt on next use.
    pub fn clear_all(&self) {
        *rw_write(&self.file_sets, SOURCE, "file_sets.clear") = None;
        self.scripts.clear();
        self.stylesheets.clear();
        self.aggregates.clear();
        info!("Cleared dependency caches");
    }

    pub fn report(&self) -> Vec<CacheReport> {
        let (file_set_entries, file_set_bytes) = {
            let slot = rw_read(&self.file_sets, SOURCE, "file_sets.report");
            slot.as_ref()
                .map(|cache| (cache.len(), cache.approximate_bytes()))
                .unwrap_or_default()
        };

        vec![
            CacheReport {
                name: "file_set_checksums",
                entries: file_set_entries,
                approximate_bytes: file_set_bytes,
            },
            CacheReport {
                name: "compressed_scripts",
                entries: self.scripts.len(),
                approximate_bytes: self.scripts.approximate_bytes(),
            },
            CacheReport {
                name: "compressed_stylesheets",
                entries: self.stylesheets.len(),
                approximate_bytes: self.stylesheets.approximate_bytes(),
            },
            CacheReport {
                name: "aggregates",
                entries: self.aggregates.len(),
                approximate_bytes: self.aggregates.approximate_bytes(),
            },
        ]
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
