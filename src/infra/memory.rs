//! In-process resource provider.
//!
//! Useful for embedding generated sources and for exercising the aggregation
//! pipeline without touching the filesystem. Every successful `open` is
//! counted per path.

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::sync::{Mutex, RwLock};

use crate::application::ports::{ResourceError, ResourceProvider};
use crate::cache::lock::{mutex_lock, rw_read, rw_write};

const SOURCE: &str = "infra::memory";

#[derive(Debug, Default)]
pub struct MemoryResourceProvider {
    files: RwLock<HashMap<String, String>>,
    failing: RwLock<HashSet<String>>,
    reads: Mutex<HashMap<String, usize>>,
}

impl MemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Make every `open` of `path` fail with an I/O error.
    pub fn with_failure(self, path: impl Into<String>) -> Self {
        rw_write(&self.failing, SOURCE, "failing.insert").insert(path.into());
        self
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        rw_write(&self.files, SOURCE, "files.insert").insert(path.into(), content.into());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        rw_write(&self.files, SOURCE, "files.remove").remove(path)
    }

    /// Number of times `path` has been opened.
    pub fn reads(&self, path: &str) -> usize {
        mutex_lock(&self.reads, SOURCE, "reads.get")
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        mutex_lock(&self.reads, SOURCE, "reads.sum").values().sum()
    }
}

impl ResourceProvider for MemoryResourceProvider {
    fn open(&self, path: &str) -> Result<Option<Box<dyn Read + Send + '_>>, ResourceError> {
        if rw_read(&self.failing, SOURCE, "failing.get").contains(path) {
            return Err(ResourceError::io(
                path,
                io::Error::other("simulated read failure"),
            ));
        }

        let Some(content) = rw_read(&self.files, SOURCE, "files.get").get(path).cloned() else {
            return Ok(None);
        };
        *mutex_lock(&self.reads, SOURCE, "reads.increment")
            .entry(path.to_string())
            .or_default() += 1;
        Ok(Some(Box::new(Cursor::new(content.into_bytes()))))
    }
}
