//! Dependency aggregation entry point.
//!
//! Turns an ordered set of script or stylesheet paths into one combined,
//! checksum-addressed artifact, reusing earlier work wherever the caches
//! allow.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::cache::{CacheManager, CacheReport, FileSetKey};
use crate::domain::{
    AggregateArtifact, Checksum, ContentKind, PathEntry, PathSet, RequestContext,
};

use super::compress::{DebugFlags, FileCompressor};
use super::globs::PathMatcher;
use super::imports::ImportResolver;
use super::ports::{Compressor, ResourceProvider, ThemeProcessor};
use super::urls::{ServingPrefix, UrlRewriter};

const METRIC_FILE_SET_HIT: &str = "collate_file_set_hit_total";
const METRIC_FILE_SET_MISS: &str = "collate_file_set_miss_total";
const METRIC_AGGREGATE_BUILD_MS: &str = "collate_aggregate_build_ms";

const INLINE_HEADER: &str = "\n/*Path=Inline insert...*/\n\n";
const INITIAL_BUFFER_BYTES: usize = 10 * 1024;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("invalid {list} pattern: {source}")]
    InvalidPattern {
        list: &'static str,
        #[source]
        source: globset::Error,
    },
}

/// Aggregation behaviour derived from configuration.
#[derive(Debug, Clone, Default)]
pub struct AggregationConfig {
    pub debug: DebugFlags,
    pub compression_exclusions: Vec<String>,
    pub missing_file_warning_suppressions: Vec<String>,
    pub serving_prefix: ServingPrefix,
}

impl From<&crate::config::Settings> for AggregationConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        let aggregation = &settings.aggregation;
        Self {
            debug: DebugFlags {
                client: aggregation.client_debug,
                collation: aggregation.collation_debug,
            },
            compression_exclusions: aggregation.compression_exclusions.clone(),
            missing_file_warning_suppressions: aggregation
                .missing_file_warning_suppressions
                .clone(),
            serving_prefix: ServingPrefix::new(
                &settings.resources.context_path,
                &settings.resources.controller_mapping,
            ),
        }
    }
}

/// External capabilities the aggregator delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub resources: Arc<dyn ResourceProvider>,
    pub script_compressor: Arc<dyn Compressor>,
    pub stylesheet_compressor: Arc<dyn Compressor>,
    pub themes: Arc<dyn ThemeProcessor>,
}

pub struct Aggregator {
    caches: Arc<CacheManager>,
    resources: Arc<dyn ResourceProvider>,
    themes: Arc<dyn ThemeProcessor>,
    files: FileCompressor,
    urls: UrlRewriter,
    debug: DebugFlags,
}

impl Aggregator {
    pub fn new(
        config: AggregationConfig,
        caches: Arc<CacheManager>,
        collaborators: Collaborators,
    ) -> Result<Self, AggregatorError> {
        let exclusions = PathMatcher::new(config.compression_exclusions.as_slice())
            .map_err(|source| AggregatorError::InvalidPattern {
                list: "compression exclusion",
                source,
            })?;
        let suppressions = PathMatcher::new(config.missing_file_warning_suppressions.as_slice())
            .map_err(|source| AggregatorError::InvalidPattern {
                list: "missing file suppression",
                source,
            })?;

        let files = FileCompressor::new(
            Arc::clone(&caches),
            Arc::clone(&collaborators.resources),
            collaborators.script_compressor,
            collaborators.stylesheet_compressor,
            exclusions,
            suppressions,
            config.debug,
        );

        Ok(Self {
            caches,
            resources: collaborators.resources,
            themes: collaborators.themes,
            files,
            urls: UrlRewriter::new(config.serving_prefix),
            debug: config.debug,
        })
    }

    pub fn resolve_scripts(&self, paths: &PathSet, ctx: &RequestContext) -> Checksum {
        self.resolve(paths, ContentKind::Script, ctx)
    }

    pub fn resolve_stylesheets(&self, paths: &PathSet, ctx: &RequestContext) -> Checksum {
        self.resolve(paths, ContentKind::Stylesheet, ctx)
    }

    /// Checksum of the combined artifact for `paths`, building and caching
    /// the artifact first unless an earlier request already did.
    ///
    /// Never fails: unreadable files are logged and left out, and a failing
    /// theme pass falls back to the unthemed stylesheet text.
    #[instrument(
        skip_all,
        fields(kind = %kind, theme = %ctx.theme, paths = paths.len())
    )]
    pub fn resolve(&self, paths: &PathSet, kind: ContentKind, ctx: &RequestContext) -> Checksum {
        let key = FileSetKey::new(kind, &ctx.theme, paths);
        // Inline text is not part of the key, so such sets never match.
        if !paths.has_inline()
            && let Some(checksum) = self.caches.file_set_checksum(&key)
        {
            if self.caches.aggregates().contains(&checksum) {
                counter!(METRIC_FILE_SET_HIT).increment(1);
                return checksum;
            }
            debug!(checksum = %checksum, "Cached checksum has no artifact; rebuilding");
        }
        counter!(METRIC_FILE_SET_MISS).increment(1);

        let started_at = Instant::now();
        let (buffer, cacheable) = self.aggregate(paths, kind, ctx);
        let combined = match kind {
            ContentKind::Stylesheet => self.apply_theme(ctx, buffer),
            ContentKind::Script => buffer,
        };

        let checksum = Checksum::compute(&combined, kind);
        self.caches.store_artifact(
            checksum.clone(),
            AggregateArtifact::new(kind, combined, self.resources.charset()),
        );
        if cacheable && !self.debug.client {
            self.caches.remember_file_set(key, checksum.clone());
        }

        histogram!(METRIC_AGGREGATE_BUILD_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(checksum = %checksum, cacheable, "Aggregated dependencies");
        checksum
    }

    /// Previously built artifact for `checksum`, if still cached.
    pub fn fetch_artifact(&self, checksum: &Checksum) -> Option<Arc<AggregateArtifact>> {
        self.caches.artifact(checksum)
    }

    pub fn clear_caches(&self) {
        self.caches.clear_all();
    }

    pub fn cache_report(&self) -> Vec<CacheReport> {
        self.caches.report()
    }

    /// Concatenate every entry; the flag reports whether the result may be
    /// remembered under the path set.
    fn aggregate(&self, paths: &PathSet, kind: ContentKind, ctx: &RequestContext) -> (String, bool) {
        let mut buffer = String::with_capacity(INITIAL_BUFFER_BYTES);
        let mut cacheable = true;

        for entry in paths {
            debug!(path = entry.summary(), "Aggregating dependency");
            match entry {
                PathEntry::Inline(text) => {
                    buffer.push_str(INLINE_HEADER);
                    buffer.push_str(text);
                    buffer.push_str("\n\n");
                    cacheable = false;
                }
                // Stylesheets are never compressed: it breaks later
                // preprocessing of the combined text.
                PathEntry::Resource(path)
                    if self.debug.client || kind == ContentKind::Stylesheet =>
                {
                    if let Some(text) = self.source_text(path, kind, ctx) {
                        append_marked(&mut buffer, path, &text);
                    }
                }
                PathEntry::Resource(path) => {
                    if let Some(text) = self.files.compressed(path, kind, ctx) {
                        append_marked(&mut buffer, path, &text);
                    }
                }
            }
        }

        (buffer, cacheable)
    }

    /// Uncompressed text of `path`; stylesheets come back flattened with
    /// their URLs made absolute.
    fn source_text(&self, path: &str, kind: ContentKind, ctx: &RequestContext) -> Option<String> {
        let text = match self.resources.read_text(path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                self.files.report_missing(path);
                return None;
            }
            Err(err) => {
                error!(path, error = %err, "Failed to read dependency; skipping");
                return None;
            }
        };

        match kind {
            ContentKind::Script => Some(text),
            ContentKind::Stylesheet => {
                let imports =
                    ImportResolver::new(&self.files, self.resources.as_ref(), &self.urls, ctx);
                let flattened = imports.resolve(path, &text);
                Some(self.urls.rewrite(path, &flattened))
            }
        }
    }

    fn apply_theme(&self, ctx: &RequestContext, css: String) -> String {
        match self.themes.apply(&ctx.theme, &css) {
            Ok(themed) => themed,
            Err(err) => {
                error!(theme = %ctx.theme, error = %err, "Failed to process themes");
                css
            }
        }
    }
}

fn append_marked(buffer: &mut String, path: &str, text: &str) {
    buffer.push_str("\n/*Path=");
    buffer.push_str(path);
    buffer.push_str("*/\n\n");
    buffer.push_str(text);
    buffer.push('\n');
}
