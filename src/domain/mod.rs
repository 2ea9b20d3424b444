//! Domain layer types and invariants.

pub mod artifact;
pub mod context;
pub mod error;
pub mod paths;
pub mod types;

pub use artifact::{AggregateArtifact, Checksum};
pub use context::{RequestContext, ThemeId};
pub use error::DomainError;
pub use paths::{INLINE_MARKER, PathEntry, PathSet};
pub use types::ContentKind;
