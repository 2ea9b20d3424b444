//! Stylesheet `url(...)` rewriting.
//!
//! Once stylesheets from different directories are concatenated, relative
//! references stop pointing where their authors meant. Every relative
//! reference is resolved against the directory of the file it came from and
//! turned into an absolute URL under the resource-serving prefix.

use std::fmt;

use tracing::debug;

const URL_OPEN: &str = "url(";
const URL_CLOSE: &str = ")";

/// Absolute mount point under which resources are served, e.g. `/share/res`.
///
/// Empty when resources are served from the site root. Never ends with `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServingPrefix(String);

impl ServingPrefix {
    /// Combine the hosting context path with the resource controller mapping.
    pub fn new(context_path: &str, controller_mapping: &str) -> Self {
        let joined: Vec<&str> = context_path
            .split('/')
            .chain(controller_mapping.split('/'))
            .filter(|segment| !segment.is_empty())
            .collect();
        if joined.is_empty() {
            Self(String::new())
        } else {
            Self(format!("/{}", joined.join("/")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Servable URL for a resource path.
    pub fn url_for(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.0, path)
    }
}

impl fmt::Display for ServingPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UrlRewriter {
    prefix: ServingPrefix,
}

impl UrlRewriter {
    pub fn new(prefix: ServingPrefix) -> Self {
        Self { prefix }
    }

    /// Rewrite every relative `url(...)` in `css` as seen from `base_path`.
    ///
    /// Data URIs, `http(s)` URLs and `/`-rooted references are left alone, so
    /// output of this function passes through it again unchanged. An opening
    /// `url(` without a closing parenthesis ends rewriting; the remainder is
    /// copied verbatim.
    pub fn rewrite(&self, base_path: &str, css: &str) -> String {
        let directory = parent_of(base_path);
        let mut out = String::with_capacity(css.len() + 64);
        let mut copied = 0;
        let mut search = 0;

        while let Some(found) = css[search..].find(URL_OPEN) {
            let start = search + found + URL_OPEN.len();
            let Some(length) = css[start..].find(URL_CLOSE) else {
                debug!(
                    path = base_path,
                    offset = start,
                    "Unterminated url() reference; leaving remainder untouched"
                );
                break;
            };
            let end = start + length;
            search = end;

            let target = unquote(css[start..end].trim());
            if is_absolute(target) {
                continue;
            }

            out.push_str(&css[copied..start]);
            out.push_str(&self.prefix.url_for(&resolve_against(directory, target)));
            copied = end;
        }

        out.push_str(&css[copied..]);
        out
    }
}

/// Strip one leading and one trailing quote character, if present.
pub(crate) fn unquote(value: &str) -> &str {
    let value = value
        .strip_prefix(['"', '\''])
        .unwrap_or(value);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

fn is_absolute(target: &str) -> bool {
    if target.starts_with("data:") || target.starts_with('/') {
        return true;
    }
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

fn resolve_against(directory: &str, target: &str) -> String {
    if let Some(rest) = target.strip_prefix("./") {
        return format!("{directory}/{rest}");
    }
    if !target.starts_with("../") {
        return format!("{directory}/{target}");
    }

    let mut parent = directory;
    let mut rest = target;
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
        parent = parent_of(parent);
    }

    if parent.ends_with('/') || rest.starts_with('/') {
        format!("{parent}{rest}")
    } else {
        format!("{parent}/{rest}")
    }
}
