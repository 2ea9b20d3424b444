//! Application layer: the aggregation pipeline and the ports it consumes.

pub mod aggregator;
pub mod compress;
pub mod error;
pub mod globs;
pub mod imports;
pub mod ports;
pub mod urls;

pub use aggregator::{AggregationConfig, Aggregator, AggregatorError, Collaborators};
pub use compress::{DebugFlags, FileCompressor};
pub use ports::{
    CompressError, Compressor, ResourceError, ResourceProvider, ThemeError, ThemeProcessor,
};
pub use urls::{ServingPrefix, UrlRewriter};
