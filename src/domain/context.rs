//! Per-request context threaded through cache key computation.

use std::fmt;

use serde::Deserialize;

/// Identifier of the active presentation theme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ThemeId(String);

impl ThemeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThemeId {
    fn default() -> Self {
        Self::new("default")
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThemeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Request-scoped values the aggregator needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub theme: ThemeId,
}

impl RequestContext {
    pub fn with_theme(theme: impl Into<ThemeId>) -> Self {
        Self {
            theme: theme.into(),
        }
    }
}
