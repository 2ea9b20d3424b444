//! Checksums and the combined artifacts they address.

use std::{fmt, sync::Arc};

use sha2::{Digest, Sha256};

use super::types::ContentKind;

/// Content-derived identifier of an aggregate, e.g. `3f2a…9c.js`.
///
/// Identical content always yields the identical checksum, so two different
/// path sets may legitimately share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checksum(String);

impl Checksum {
    /// Digest `content` and append the suffix for `kind`.
    pub fn compute(content: &str, kind: ContentKind) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(format!("{}{}", hex::encode(hasher.finalize()), kind.extension()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<ContentKind> {
        ContentKind::from_extension(&self.0)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Checksum {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Concatenated output for one path set, as served to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateArtifact {
    pub mime_type: &'static str,
    pub content: Arc<str>,
    pub charset: String,
}

impl AggregateArtifact {
    pub fn new(kind: ContentKind, content: impl Into<Arc<str>>, charset: impl Into<String>) -> Self {
        Self {
            mime_type: kind.mime_type(),
            content: content.into(),
            charset: charset.into(),
        }
    }

    /// Value for a `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("{};charset={}", self.mime_type, self.charset)
    }

    /// Approximate memory held by this artifact.
    pub fn stored_size(&self) -> usize {
        self.content.len() + self.charset.len() + self.mime_type.len()
    }
}
