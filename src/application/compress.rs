//! Per-file cache front end.
//!
//! Produces the compressed (or, when excluded, raw) text of a single resource
//! and memoizes it in the per-file cache for its content kind.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, warn};

use crate::cache::{CacheManager, FileKey};
use crate::domain::{ContentKind, RequestContext};

use super::globs::PathMatcher;
use super::ports::{Compressor, ResourceProvider};

const METRIC_RESOURCE_MISSING: &str = "collate_resource_missing_total";
const METRIC_COMPRESS_FALLBACK: &str = "collate_compress_fallback_total";

/// Switches that trade output size for readability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugFlags {
    /// Skip compression entirely and never remember file sets.
    pub client: bool,
    /// Keep script compression out of the way so concatenation seams stay
    /// readable.
    pub collation: bool,
}

pub struct FileCompressor {
    caches: Arc<CacheManager>,
    provider: Arc<dyn ResourceProvider>,
    script: Arc<dyn Compressor>,
    stylesheet: Arc<dyn Compressor>,
    exclusions: PathMatcher,
    suppressions: PathMatcher,
    debug: DebugFlags,
}

impl FileCompressor {
    pub fn new(
        caches: Arc<CacheManager>,
        provider: Arc<dyn ResourceProvider>,
        script: Arc<dyn Compressor>,
        stylesheet: Arc<dyn Compressor>,
        exclusions: PathMatcher,
        suppressions: PathMatcher,
        debug: DebugFlags,
    ) -> Self {
        Self {
            caches,
            provider,
            script,
            stylesheet,
            exclusions,
            suppressions,
            debug,
        }
    }

    /// Compressed text of `path`, or `None` when it cannot be read.
    ///
    /// Cached entries are reused unless client debugging is on. A compressor
    /// failure falls back to the raw text, which is cached all the same so the
    /// failure is not repeated on every request.
    pub fn compressed(
        &self,
        path: &str,
        kind: ContentKind,
        ctx: &RequestContext,
    ) -> Option<Arc<str>> {
        let cache = self.caches.files(kind);
        let key = FileKey::new(kind, &ctx.theme, path);
        if !self.debug.client
            && let Some(hit) = cache.get(&key)
        {
            return Some(hit);
        }

        debug!(path, kind = %kind, "Compressing dependency");
        let source = match self.provider.read_text(path) {
            Ok(Some(source)) => source,
            Ok(None) => {
                self.report_missing(path);
                return None;
            }
            Err(err) => {
                error!(path, error = %err, "Failed to read dependency; skipping");
                return None;
            }
        };

        let text = if self.exclusions.is_match(path) {
            source
        } else {
            self.compress(path, kind, source)
        };
        Some(cache.insert(key, text))
    }

    fn compress(&self, path: &str, kind: ContentKind, source: String) -> String {
        let compressor = match kind {
            ContentKind::Script if self.debug.collation => return source,
            ContentKind::Script => &self.script,
            ContentKind::Stylesheet => &self.stylesheet,
        };

        match compressor.compress(&source) {
            Ok(compressed) => compressed,
            Err(err) => {
                counter!(METRIC_COMPRESS_FALLBACK).increment(1);
                warn!(path, error = %err, "Compression failed; using uncompressed source");
                source
            }
        }
    }

    /// Log a dependency that could not be located, unless it is on the
    /// suppression list.
    pub fn report_missing(&self, path: &str) {
        counter!(METRIC_RESOURCE_MISSING).increment(1);
        if self.suppressions.is_match(path) {
            debug!(path, "Missing dependency is on the suppression list");
        } else {
            error!(path, "Could not find dependency");
        }
    }
}
