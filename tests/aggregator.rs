use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use collate::application::{
    AggregationConfig, Aggregator, Collaborators, CompressError, Compressor, DebugFlags,
    ServingPrefix, ThemeProcessor,
};
use collate::cache::{CacheConfig, CacheManager};
use collate::domain::{Checksum, ContentKind, PathSet, RequestContext};
use collate::infra::compressors::PassthroughCompressor;
use collate::infra::memory::MemoryResourceProvider;
use collate::infra::theme::{NoopThemeProcessor, TokenThemeProcessor};

/// Upper-cases its input so compressed output is recognisable.
#[derive(Default)]
struct ShoutingCompressor {
    calls: AtomicUsize,
}

impl Compressor for ShoutingCompressor {
    fn compress(&self, source: &str) -> Result<String, CompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(source.to_uppercase())
    }
}

#[derive(Default)]
struct FailingCompressor {
    calls: AtomicUsize,
}

impl Compressor for FailingCompressor {
    fn compress(&self, _source: &str) -> Result<String, CompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CompressError::Rejected("unterminated string literal".to_string()))
    }
}

struct Harness {
    provider: Arc<MemoryResourceProvider>,
    config: AggregationConfig,
    limit: usize,
    script_compressor: Arc<dyn Compressor>,
    themes: Arc<dyn ThemeProcessor>,
}

impl Harness {
    fn new(provider: MemoryResourceProvider) -> Self {
        Self {
            provider: Arc::new(provider),
            config: AggregationConfig {
                serving_prefix: ServingPrefix::new("", "/res"),
                ..Default::default()
            },
            limit: 256,
            script_compressor: Arc::new(PassthroughCompressor),
            themes: Arc::new(NoopThemeProcessor),
        }
    }

    fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn debug(mut self, debug: DebugFlags) -> Self {
        self.config.debug = debug;
        self
    }

    fn exclusions(mut self, patterns: &[&str]) -> Self {
        self.config.compression_exclusions = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    fn scripts(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.script_compressor = compressor;
        self
    }

    fn themes(mut self, themes: Arc<dyn ThemeProcessor>) -> Self {
        self.themes = themes;
        self
    }

    fn build(&self) -> Aggregator {
        let caches = Arc::new(CacheManager::new(CacheConfig {
            file_set_cache_limit: self.limit,
        }));
        let collaborators = Collaborators {
            resources: self.provider.clone(),
            script_compressor: Arc::clone(&self.script_compressor),
            stylesheet_compressor: Arc::new(PassthroughCompressor),
            themes: Arc::clone(&self.themes),
        };
        Aggregator::new(self.config.clone(), caches, collaborators).expect("aggregator builds")
    }
}

fn paths(entries: &[&str]) -> PathSet {
    entries.iter().copied().collect()
}

fn content(aggregator: &Aggregator, checksum: &Checksum) -> String {
    aggregator
        .fetch_artifact(checksum)
        .expect("artifact cached")
        .content
        .to_string()
}

fn file_set_entries(aggregator: &Aggregator) -> usize {
    aggregator
        .cache_report()
        .into_iter()
        .find(|report| report.name == "file_set_checksums")
        .map(|report| report.entries)
        .unwrap_or_default()
}

fn scripts() -> MemoryResourceProvider {
    MemoryResourceProvider::new()
        .with_file("/a.js", "x")
        .with_file("/b.js", "y")
}

#[test]
fn concatenates_scripts_with_path_markers() {
    let harness = Harness::new(scripts());
    let aggregator = harness.build();

    let checksum = aggregator.resolve_scripts(&paths(&["/a.js", "/b.js"]), &RequestContext::default());
    let artifact = aggregator.fetch_artifact(&checksum).expect("artifact cached");

    assert_eq!(
        &*artifact.content,
        "\n/*Path=/a.js*/\n\nx\n\n/*Path=/b.js*/\n\ny\n"
    );
    assert_eq!(artifact.mime_type, "text/javascript");
    assert_eq!(artifact.content_type(), "text/javascript;charset=UTF-8");
    assert!(checksum.as_str().ends_with(".js"));
    assert_eq!(
        checksum,
        Checksum::compute(&artifact.content, ContentKind::Script)
    );
}

#[test]
fn repeated_resolution_reuses_cached_checksum() {
    let harness = Harness::new(scripts());
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    let first = aggregator.resolve_scripts(&paths(&["/a.js", "/b.js"]), &ctx);
    let reads = harness.provider.total_reads();
    let second = aggregator.resolve_scripts(&paths(&["/a.js", "/b.js"]), &ctx);

    assert_eq!(first, second);
    assert_eq!(harness.provider.total_reads(), reads);
    assert_eq!(file_set_entries(&aggregator), 1);
}

#[test]
fn markers_follow_request_order() {
    let harness = Harness::new(scripts().with_file("/c.js", "z"));
    let aggregator = harness.build();

    let checksum =
        aggregator.resolve_scripts(&paths(&["/c.js", "/a.js", "/b.js"]), &RequestContext::default());
    let text = content(&aggregator, &checksum);

    let c = text.find("/*Path=/c.js*/").expect("c marker");
    let a = text.find("/*Path=/a.js*/").expect("a marker");
    let b = text.find("/*Path=/b.js*/").expect("b marker");
    assert!(c < a && a < b);
}

#[test]
fn stylesheet_imports_are_flattened_and_urls_rewritten() {
    let provider = MemoryResourceProvider::new()
        .with_file("/styles/a.css", "@import url(./b.css);")
        .with_file("/styles/b.css", "a{background:url(img.png)}");
    let harness = Harness::new(provider);
    let aggregator = harness.build();

    let checksum =
        aggregator.resolve_stylesheets(&paths(&["/styles/a.css"]), &RequestContext::default());
    let artifact = aggregator.fetch_artifact(&checksum).expect("artifact cached");

    assert_eq!(
        &*artifact.content,
        "\n/*Path=/styles/a.css*/\n\na{background:url(/res/styles/img.png)};\n"
    );
    assert_eq!(artifact.content_type(), "text/css;charset=UTF-8");
    assert!(checksum.as_str().ends_with(".css"));
}

#[test]
fn import_cycles_include_each_body_once() {
    let provider = MemoryResourceProvider::new()
        .with_file("/a.css", "@import url(b.css);.a{}")
        .with_file("/b.css", "@import url(a.css);.b{}");
    let harness = Harness::new(provider);
    let aggregator = harness.build();

    let checksum = aggregator.resolve_stylesheets(&paths(&["/a.css"]), &RequestContext::default());
    let text = content(&aggregator, &checksum);

    assert_eq!(text.matches(".a{}").count(), 1);
    assert_eq!(text.matches(".b{}").count(), 1);
}

#[test]
fn stylesheets_are_never_compressed() {
    let provider = MemoryResourceProvider::new().with_file("/a.css", ".a{}");
    let shouting = Arc::new(ShoutingCompressor::default());
    let harness = Harness::new(provider).scripts(shouting.clone());
    let aggregator = harness.build();

    let checksum = aggregator.resolve_stylesheets(&paths(&["/a.css"]), &RequestContext::default());

    assert!(content(&aggregator, &checksum).contains(".a{}"));
    assert_eq!(shouting.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn eviction_removes_the_aggregate() {
    let harness = Harness::new(scripts()).limit(1);
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    let first = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    let second = aggregator.resolve_scripts(&paths(&["/b.js"]), &ctx);

    assert!(aggregator.fetch_artifact(&first).is_none());
    assert!(aggregator.fetch_artifact(&second).is_some());

    let again = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    assert_eq!(again, first);
    assert!(aggregator.fetch_artifact(&first).is_some());
    assert!(aggregator.fetch_artifact(&second).is_none());
}

#[test]
fn shared_checksum_survives_until_last_path_set_is_evicted() {
    let harness = Harness::new(scripts()).limit(2);
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    // A missing file adds nothing, so both sets produce identical content.
    let shared = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    let same = aggregator.resolve_scripts(&paths(&["/a.js", "/missing.js"]), &ctx);
    assert_eq!(shared, same);

    aggregator.resolve_scripts(&paths(&["/b.js"]), &ctx);
    assert!(aggregator.fetch_artifact(&shared).is_some());

    aggregator.resolve_scripts(&paths(&["/b.js", "/a.js"]), &ctx);
    assert!(aggregator.fetch_artifact(&shared).is_none());
}

#[test]
fn themes_produce_distinct_artifacts() {
    let provider = MemoryResourceProvider::new().with_file("/a.css", "a{color:$fg}");
    let themes = TokenThemeProcessor::default()
        .with_theme("light", [("fg", "#000")])
        .with_theme("dark", [("fg", "#fff")]);
    let harness = Harness::new(provider).themes(Arc::new(themes));
    let aggregator = harness.build();
    let set = paths(&["/a.css"]);

    let light = aggregator.resolve_stylesheets(&set, &RequestContext::with_theme("light"));
    let dark = aggregator.resolve_stylesheets(&set, &RequestContext::with_theme("dark"));

    assert_ne!(light, dark);
    assert!(content(&aggregator, &light).contains("a{color:#000}"));
    assert!(content(&aggregator, &dark).contains("a{color:#fff}"));
    assert_eq!(file_set_entries(&aggregator), 2);

    let reads = harness.provider.reads("/a.css");
    assert_eq!(
        aggregator.resolve_stylesheets(&set, &RequestContext::with_theme("light")),
        light
    );
    assert_eq!(harness.provider.reads("/a.css"), reads);
}

#[test]
fn theme_failure_falls_back_to_unthemed_text() {
    let provider = MemoryResourceProvider::new().with_file("/a.css", "a{color:$fg}");
    let themes = TokenThemeProcessor::default().with_theme("light", [("fg", "#000")]);
    let harness = Harness::new(provider).themes(Arc::new(themes));
    let aggregator = harness.build();

    let checksum =
        aggregator.resolve_stylesheets(&paths(&["/a.css"]), &RequestContext::with_theme("neon"));

    assert!(content(&aggregator, &checksum).contains("a{color:$fg}"));
}

#[test]
fn concurrent_requests_agree_on_one_checksum() {
    let harness = Harness::new(scripts());
    let aggregator = Arc::new(harness.build());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let aggregator = Arc::clone(&aggregator);
            thread::spawn(move || {
                aggregator.resolve_scripts(&paths(&["/a.js", "/b.js"]), &RequestContext::default())
            })
        })
        .collect();
    let checksums: Vec<Checksum> = handles
        .into_iter()
        .map(|handle| handle.join().expect("resolver thread"))
        .collect();

    assert!(checksums.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(aggregator.fetch_artifact(&checksums[0]).is_some());
    assert_eq!(file_set_entries(&aggregator), 1);
}

#[test]
fn unreadable_files_are_skipped() {
    let harness = Harness::new(scripts().with_failure("/broken.js"));
    let aggregator = harness.build();

    let checksum = aggregator.resolve_scripts(
        &paths(&["/a.js", "/missing.js", "/broken.js", "/b.js"]),
        &RequestContext::default(),
    );
    let text = content(&aggregator, &checksum);

    assert_eq!(text, "\n/*Path=/a.js*/\n\nx\n\n/*Path=/b.js*/\n\ny\n");
}

#[test]
fn compressor_failure_falls_back_and_is_cached() {
    let failing = Arc::new(FailingCompressor::default());
    let harness = Harness::new(scripts()).scripts(failing.clone());
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    let checksum = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    assert!(content(&aggregator, &checksum).contains("\n\nx\n"));
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

    // A different set reuses the per-file entry for `/a.js`.
    aggregator.resolve_scripts(&paths(&["/a.js", "/b.js"]), &ctx);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    assert_eq!(harness.provider.reads("/a.js"), 1);
}

#[test]
fn excluded_paths_are_not_compressed() {
    let provider = MemoryResourceProvider::new()
        .with_file("/js/lib/vendor.min.js", "vendor")
        .with_file("/js/app.js", "app");
    let shouting = Arc::new(ShoutingCompressor::default());
    let harness = Harness::new(provider)
        .scripts(shouting.clone())
        .exclusions(&["/js/lib/**"]);
    let aggregator = harness.build();

    let checksum = aggregator.resolve_scripts(
        &paths(&["/js/lib/vendor.min.js", "/js/app.js"]),
        &RequestContext::default(),
    );
    let text = content(&aggregator, &checksum);

    assert!(text.contains("\n\nvendor\n"));
    assert!(text.contains("\n\nAPP\n"));
    assert_eq!(shouting.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn inline_fragments_are_embedded_but_never_remembered() {
    let harness = Harness::new(scripts());
    let aggregator = harness.build();
    let ctx = RequestContext::default();
    let set = paths(&[">>>var inline = 1;", "/a.js"]);

    let first = aggregator.resolve_scripts(&set, &ctx);
    let second = aggregator.resolve_scripts(&set, &ctx);

    assert_eq!(first, second);
    assert_eq!(
        content(&aggregator, &first),
        "\n/*Path=Inline insert...*/\n\nvar inline = 1;\n\n\n/*Path=/a.js*/\n\nx\n"
    );
    assert_eq!(file_set_entries(&aggregator), 0);
}

#[test]
fn client_debug_skips_compression_and_caching() {
    let shouting = Arc::new(ShoutingCompressor::default());
    let harness = Harness::new(scripts())
        .scripts(shouting.clone())
        .debug(DebugFlags {
            client: true,
            collation: false,
        });
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    let first = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    let second = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);

    assert_eq!(first, second);
    assert_eq!(content(&aggregator, &first), "\n/*Path=/a.js*/\n\nx\n");
    assert_eq!(harness.provider.reads("/a.js"), 2);
    assert_eq!(shouting.calls.load(Ordering::SeqCst), 0);
    assert_eq!(file_set_entries(&aggregator), 0);
}

#[test]
fn collation_debug_bypasses_script_compressor() {
    let shouting = Arc::new(ShoutingCompressor::default());
    let harness = Harness::new(scripts())
        .scripts(shouting.clone())
        .debug(DebugFlags {
            client: false,
            collation: true,
        });
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    let checksum = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);

    assert_eq!(content(&aggregator, &checksum), "\n/*Path=/a.js*/\n\nx\n");
    assert_eq!(shouting.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.provider.reads("/a.js"), 1);
}

#[test]
fn clearing_caches_forces_a_rebuild() {
    let harness = Harness::new(scripts());
    let aggregator = harness.build();
    let ctx = RequestContext::default();

    let checksum = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    aggregator.clear_caches();

    assert!(aggregator.fetch_artifact(&checksum).is_none());
    assert!(aggregator.cache_report().iter().all(|report| report.entries == 0));

    harness.provider.insert("/a.js", "changed");
    let rebuilt = aggregator.resolve_scripts(&paths(&["/a.js"]), &ctx);
    assert_ne!(rebuilt, checksum);
    assert_eq!(content(&aggregator, &rebuilt), "\n/*Path=/a.js*/\n\nchanged\n");
}

#[test]
fn invalid_exclusion_pattern_is_rejected() {
    let harness = Harness::new(scripts()).exclusions(&["/js/[broken"]);
    let caches = Arc::new(CacheManager::default());
    let collaborators = Collaborators {
        resources: harness.provider.clone(),
        script_compressor: Arc::new(PassthroughCompressor),
        stylesheet_compressor: Arc::new(PassthroughCompressor),
        themes: Arc::new(NoopThemeProcessor),
    };

    assert!(Aggregator::new(harness.config.clone(), caches, collaborators).is_err());
}
