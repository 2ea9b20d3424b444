//! Capability traits implemented by collaborators outside the aggregation core.

use std::io::Read;

use thiserror::Error;

use crate::domain::ThemeId;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to read resource `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("resource path `{path}` rejected: {reason}")]
    Rejected { path: String, reason: &'static str },
}

impl ResourceError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompressError {
    #[error("compressor rejected input: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("theme `{0}` is not configured")]
    UnknownTheme(String),
    #[error("theme processing failed: {0}")]
    Processing(String),
}

/// Locates dependency resources and decodes them to text.
pub trait ResourceProvider: Send + Sync {
    /// Open a stream for `path`, or `Ok(None)` when nothing lives there.
    fn open(&self, path: &str) -> Result<Option<Box<dyn Read + Send + '_>>, ResourceError>;

    /// Charset declared for decoded resources and served artifacts.
    fn charset(&self) -> &str {
        "UTF-8"
    }

    /// Read the full resource into text. The stream is dropped before returning.
    ///
    /// Bytes are decoded as UTF-8; invalid sequences become U+FFFD.
    fn read_text(&self, path: &str) -> Result<Option<String>, ResourceError> {
        let Some(mut stream) = self.open(path)? else {
            return Ok(None);
        };
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|err| ResourceError::io(path, err))?;
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Resolve `target` as referenced from the resource at `base`.
    fn relative_path(&self, base: &str, target: &str) -> String {
        resolve_relative(base, target)
    }
}

/// Compacts script or stylesheet source.
pub trait Compressor: Send + Sync {
    fn compress(&self, source: &str) -> Result<String, CompressError>;
}

/// Applies theme token substitution to stylesheet text.
pub trait ThemeProcessor: Send + Sync {
    fn apply(&self, theme: &ThemeId, css: &str) -> Result<String, ThemeError>;
}

/// Join `target` onto the directory of `base`, folding `.` and `..` segments.
///
/// Rooted targets are returned unchanged.
pub fn resolve_relative(base: &str, target: &str) -> String {
    if target.starts_with('/') {
        return target.to_string();
    }

    let rooted = base.starts_with('/');
    let mut segments: Vec<&str> = match base.rfind('/') {
        Some(idx) => base[..idx].split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if rooted { format!("/{joined}") } else { joined }
}
