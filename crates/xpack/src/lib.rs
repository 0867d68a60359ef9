//! # XPACK
//!
//! An experimental general-purpose lossless compression format in the LZ77
//! family, borrowing ideas from DEFLATE (log-ranged length/offset codes),
//! LZX (recent-offsets queue, aligned offset blocks) and Zstandard
//! (tANS/FSE entropy coding, interleaved literal streams).
//!
//! ## Pipeline
//!
//! ```text
//! Input bytes
//!     │
//!     ▼
//! ┌─────────────────────────────────────┐
//! │  Match finding (lz)                 │
//! │  hash chains + recent-offset probes │
//! └─────────────────────────────────────┘
//!     │ literals + (length, offset) matches
//!     ▼
//! ┌─────────────────────────────────────┐
//! │  Parsing (compress)                 │
//! │  greedy / lazy / two-step lazy      │
//! └─────────────────────────────────────┘
//!     │ blocks of sequences
//!     ▼
//! ┌─────────────────────────────────────┐
//! │  Block codec (block + fse + bitio)  │
//! │  FSE tables, interleaved streams,   │
//! │  aligned tail, raw fallback         │
//! └─────────────────────────────────────┘
//!     │
//!     ▼
//! Compressed stream
//! ```
//!
//! Decompression runs the exact inverse and is byte-exact for every input
//! the compressor accepts.
//!
//! ## Usage
//!
//! ```
//! use xpack::{Compressor, Decompressor};
//! use xpack_core::CompressionLevel;
//!
//! let data = b"an example payload, an example payload, an example payload";
//! let mut compressor = Compressor::new(data.len(), CompressionLevel::Default).unwrap();
//! let mut compressed = vec![0u8; xpack::max_compressed_size(data.len())];
//! let written = compressor.compress(data, &mut compressed);
//! assert!(written > 0);
//!
//! let mut decompressor = Decompressor::new();
//! let mut restored = vec![0u8; data.len()];
//! decompressor.decompress(&compressed[..written], &mut restored).unwrap();
//! assert_eq!(&restored, data);
//! ```
//!
//! The stream format is experimental and carries no stability promise; a
//! compressor and decompressor from the same build always agree.

pub mod bitio;
pub mod block;
pub mod fse;
pub mod lz;

mod compress;
mod decompress;
#[cfg(feature = "x86")]
mod x86;

pub use compress::Compressor;
pub use decompress::Decompressor;
pub use lz::{MAX_MATCH, MIN_MATCH};
pub use xpack_core::{CompressionLevel, Error, Result};

/// Largest input buffer a compressor can be sized for (matches the
/// container's largest chunk size).
pub const MAX_BUFFER_SIZE: usize = 1 << 26;

/// Flag bits carried in the first byte of every stream.
pub mod stream_flags {
    /// The input was run through the x86 displacement preprocessor.
    pub const X86_TRANSLATED: u8 = 0x01;
}

/// Output buffer size sufficient for `compress` on any input of
/// `input_len` bytes: every block falls back to raw storage before it can
/// expand past its input, leaving only per-block headers and the stream
/// flags byte.
pub fn max_compressed_size(input_len: usize) -> usize {
    let blocks = input_len / block::MAX_BLOCK_INPUT + 1;
    input_len + 12 * blocks + 16
}

// Trait plumbing: the engine types implement the xpack-core one-shot
// traits so callers can stay generic over codecs.

impl xpack_core::traits::Compressor for Compressor {
    fn level(&self) -> CompressionLevel {
        CompressionLevel::from_level(Compressor::level(self))
    }

    fn compress_to(&mut self, input: &[u8], output: &mut [u8]) -> usize {
        Compressor::compress(self, input, output)
    }

    fn max_compressed_size(&self, input_len: usize) -> usize {
        max_compressed_size(input_len)
    }
}

impl xpack_core::traits::Decompressor for Decompressor {
    fn decompress_to(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        Decompressor::decompress(self, input, output)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_compressed_size_covers_small_inputs() {
        assert!(max_compressed_size(0) >= 16);
        assert!(max_compressed_size(1) > 1 + 12);
        // One block of header overhead per 4 MiB of input.
        let n = 10 << 20;
        assert!(max_compressed_size(n) < n + 1024);
    }

    #[test]
    fn test_trait_plumbing_composes() {
        use xpack_core::traits::{Compressor as CompressorTrait, Decompressor as DecompressorTrait};

        let data = b"compose compose compose compose compose".repeat(8);
        let mut c = Compressor::new(data.len(), CompressionLevel::Best).unwrap();
        let compressed = CompressorTrait::compress(&mut c, &data).expect("compressible");
        let mut d = Decompressor::new();
        let restored = DecompressorTrait::decompress_with_size(&mut d, &compressed, data.len())
            .unwrap();
        assert_eq!(restored, data);
    }

    #[cfg(feature = "x86")]
    #[test]
    fn test_x86_stream_roundtrip() {
        let mut data = Vec::new();
        for i in 0u32..4000 {
            data.extend_from_slice(&[0x48, 0x8B, 0x05]);
            data.push(0xE8);
            data.extend_from_slice(&(i.wrapping_mul(0x1234) as i32).to_le_bytes());
        }
        let mut c = Compressor::new(data.len(), CompressionLevel::Default).unwrap();
        c.set_x86_translation(true);
        let mut out = vec![0u8; max_compressed_size(data.len())];
        let written = c.compress(&data, &mut out);
        assert!(written > 0);
        assert_eq!(out[0] & stream_flags::X86_TRANSLATED, 1);

        let mut d = Decompressor::new();
        let mut restored = vec![0u8; data.len()];
        d.decompress(&out[..written], &mut restored).unwrap();
        assert_eq!(restored, data);
    }
}
