//! Shared domain enumerations.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Kind of dependency being aggregated.
///
/// Determines the MIME type served for the combined artifact, the suffix
/// appended to its checksum and which compressor slot is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Script,
    Stylesheet,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Script => "script",
            ContentKind::Stylesheet => "stylesheet",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ContentKind::Script => "text/javascript",
            ContentKind::Stylesheet => "text/css",
        }
    }

    /// Suffix appended to the digest to form the public checksum.
    pub fn extension(self) -> &'static str {
        match self {
            ContentKind::Script => ".js",
            ContentKind::Stylesheet => ".css",
        }
    }

    pub fn from_extension(name: &str) -> Option<Self> {
        if name.ends_with(ContentKind::Script.extension()) {
            Some(ContentKind::Script)
        } else if name.ends_with(ContentKind::Stylesheet.extension()) {
            Some(ContentKind::Stylesheet)
        } else {
            None
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "js" | "script" | "javascript" => Ok(ContentKind::Script),
            "css" | "stylesheet" | "style" => Ok(ContentKind::Stylesheet),
            other => Err(DomainError::validation(format!(
                "unknown content kind `{other}` (expected js or css)"
            ))),
        }
    }
}
