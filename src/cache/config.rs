//! Cache configuration.
//!
//! Controls the bounded file-set cache via `collate.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_FILE_SET_CACHE_LIMIT: usize = 256;

/// Cache configuration from `collate.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum path sets remembered before the oldest is evicted, taking its
    /// aggregate with it.
    pub file_set_cache_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_set_cache_limit: DEFAULT_FILE_SET_CACHE_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            file_set_cache_limit: settings.file_set_cache_limit.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the file-set limit as NonZeroUsize, clamping to 1 if zero.
    pub fn file_set_cache_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.file_set_cache_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.file_set_cache_limit, 256);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            file_set_cache_limit: 0,
        };
        assert_eq!(config.file_set_cache_limit_non_zero().get(), 1);
    }
}
