//! Core traits for compression and decompression.
//!
//! Both traits are one-shot: every call runs to completion over a whole
//! buffer. Implementations keep their scratch state internally, so the
//! receivers are `&mut self` even though the operations are logically pure.

use crate::error::Result;
use crate::types::{CompressionLevel, CompressionRatio};

/// One-shot compression over caller-provided buffers.
pub trait Compressor {
    /// Get the configured compression level.
    fn level(&self) -> CompressionLevel;

    /// Compress data into an existing buffer.
    ///
    /// Returns the number of bytes written, or 0 when the compressed form
    /// would not fit in `output` (the caller should store the data raw).
    fn compress_to(&mut self, input: &[u8], output: &mut [u8]) -> usize;

    /// Calculate an output buffer size sufficient for any input of the
    /// given length.
    fn max_compressed_size(&self, input_len: usize) -> usize;

    /// Compress data in one shot into a freshly sized vector.
    ///
    /// Returns `None` when the input is incompressible relative to the
    /// worst-case bound (which cannot happen for the XPACK engine, but the
    /// contract allows it).
    fn compress(&mut self, input: &[u8]) -> Option<Vec<u8>> {
        let mut output = vec![0u8; self.max_compressed_size(input.len())];
        let written = self.compress_to(input, &mut output);
        if written == 0 && !input.is_empty() {
            return None;
        }
        output.truncate(written);
        Some(output)
    }

    /// Get compression ratio for given data.
    fn measure_ratio(&mut self, input: &[u8]) -> Option<CompressionRatio> {
        let compressed = self.compress(input)?;
        Some(CompressionRatio::new(input.len(), compressed.len()))
    }
}

/// One-shot decompression over caller-provided buffers.
pub trait Decompressor {
    /// Decompress data into an existing buffer.
    ///
    /// `output.len()` is the expected decompressed size; on success exactly
    /// that many bytes have been written.
    fn decompress_to(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize>;

    /// Decompress with known output size into a fresh vector.
    fn decompress_with_size(&mut self, input: &[u8], output_size: usize) -> Result<Vec<u8>> {
        let mut output = vec![0u8; output_size];
        let written = self.decompress_to(input, &mut output)?;
        output.truncate(written);
        Ok(output)
    }
}
