//! Infrastructure adapters and runtime bootstrap.

pub mod compressors;
pub mod error;
pub mod fs;
pub mod memory;
pub mod telemetry;
pub mod theme;
