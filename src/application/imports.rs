//! Stylesheet `@import` flattening.
//!
//! Recognised directive syntax (exactly this, nothing else):
//!
//! ```text
//! @import<ws>url<ws>(<target>)
//! ```
//!
//! where `<target>` may be wrapped in single or double quotes. The trailing
//! `;` and any media query are not part of the match and stay in place.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::{ContentKind, RequestContext};

use super::compress::FileCompressor;
use super::ports::ResourceProvider;
use super::urls::{UrlRewriter, unquote};

static IMPORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(@import[\s\t]*url[\s\t]*\((.*?)\))").expect("import pattern compiles")
});

/// Expands imports of one top-level stylesheet.
pub struct ImportResolver<'a> {
    files: &'a FileCompressor,
    provider: &'a dyn ResourceProvider,
    urls: &'a UrlRewriter,
    ctx: &'a RequestContext,
}

impl<'a> ImportResolver<'a> {
    pub fn new(
        files: &'a FileCompressor,
        provider: &'a dyn ResourceProvider,
        urls: &'a UrlRewriter,
        ctx: &'a RequestContext,
    ) -> Self {
        Self {
            files,
            provider,
            urls,
            ctx,
        }
    }

    /// Replace every import in `css` (the content of `path`) with the
    /// imported stylesheet, recursively.
    ///
    /// Each stylesheet is expanded at most once per call, the top-level one
    /// included. A directive that would expand an already expanded file stays
    /// in place with its URL made absolute. Directives whose target cannot be
    /// found are left exactly as written.
    pub fn resolve(&self, path: &str, css: &str) -> String {
        let mut visited = HashSet::from([path.to_string()]);
        self.expand(path, css, &mut visited)
    }

    fn expand(&self, css_path: &str, css: &str, visited: &mut HashSet<String>) -> String {
        let mut out = String::with_capacity(css.len());
        let mut copied = 0;

        for captures in IMPORT_PATTERN.captures_iter(css) {
            let (Some(directive), Some(target)) = (captures.get(0), captures.get(2)) else {
                continue;
            };
            let target = unquote(target.as_str().trim());
            if target.is_empty() {
                continue;
            }

            let import_path = self.provider.relative_path(css_path, target);
            if let Some(replacement) =
                self.import(css_path, &import_path, directive.as_str(), visited)
            {
                out.push_str(&css[copied..directive.start()]);
                out.push_str(&replacement);
                copied = directive.end();
            }
        }

        out.push_str(&css[copied..]);
        out
    }

    fn import(
        &self,
        css_path: &str,
        import_path: &str,
        directive: &str,
        visited: &mut HashSet<String>,
    ) -> Option<String> {
        if import_path == css_path || visited.contains(import_path) {
            debug!(
                from = css_path,
                import = import_path,
                "Stylesheet already expanded; keeping import directive"
            );
            return Some(self.urls.rewrite(css_path, directive));
        }

        let body = self
            .files
            .compressed(import_path, ContentKind::Stylesheet, self.ctx)?;
        visited.insert(import_path.to_string());
        let expanded = self.expand(import_path, &body, visited);
        Some(self.urls.rewrite(import_path, &expanded))
    }
}
