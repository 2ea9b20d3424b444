use crate::application::ports::{CompressError, Compressor};

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompressor;

impl Compressor for PassthroughCompressor {
    fn compress(&self, source: &str) -> Result<String, CompressError> {
        Ok(source.to_string())
    }
}
