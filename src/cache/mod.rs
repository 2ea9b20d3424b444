//! Dependency aggregation caches
//!
//! Three layers, all process-local and owned by one [`CacheManager`]:
//!
//! - **Per-file**: resolved/compressed text of single resources, one map per
//!   content kind, stylesheet entries keyed by theme
//! - **Aggregate**: combined artifacts addressed by checksum
//! - **File-set**: bounded path-set → checksum map whose evictions remove the
//!   matching aggregate
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! file_set_cache_limit = 256
//! ```

mod config;
mod file_set;
mod keys;
pub(crate) mod lock;
mod manager;
mod store;

pub use config::CacheConfig;
pub use file_set::{EvictionListener, FileSetCache};
pub use keys::{FileKey, FileSetKey};
pub use manager::{CacheManager, CacheReport};
pub use store::{AggregateStore, FileCache};
