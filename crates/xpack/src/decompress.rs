//! Decompression driver.
//!
//! The decompressor iterates blocks until the expected output length has
//! been produced. The output buffer doubles as the back-reference window,
//! so matches can reach any previously produced byte. All staging
//! structures live in the decompressor and are reused across calls.

use crate::bitio::BitReader;
use crate::block::{decode_block, DecodeScratch};
use crate::lz::RecentOffsets;
use crate::stream_flags;
use xpack_core::{Error, Result};

/// XPACK decompressor.
///
/// Long-lived and reusable; one instance per thread.
#[derive(Debug, Default)]
pub struct Decompressor {
    scratch: DecodeScratch,
    roq: RecentOffsets,
}

impl Decompressor {
    /// Create a decompressor.
    pub fn new() -> Self {
        Self {
            scratch: DecodeScratch::new(),
            roq: RecentOffsets::new(),
        }
    }

    /// Decompress `input` into `output`, whose length is the expected
    /// decompressed size.
    ///
    /// On success exactly `output.len()` bytes have been written. Fails
    /// with `CorruptedData`/`UnexpectedEof` on malformed or truncated
    /// streams, `BufferTooSmall` when the stream describes more output
    /// than expected, and `Unsupported` when the stream requires a
    /// preprocessor this build lacks. Never reads or writes out of
    /// bounds, whatever the input bytes are.
    pub fn decompress(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        if output.is_empty() {
            return if input.is_empty() {
                Ok(0)
            } else {
                Err(Error::corrupted("nonempty stream for empty output"))
            };
        }
        if input.is_empty() {
            return Err(Error::unexpected_eof(0));
        }

        let flags = input[0];
        if flags & !stream_flags::X86_TRANSLATED != 0 {
            return Err(Error::corrupted("unknown stream flags"));
        }
        let x86 = flags & stream_flags::X86_TRANSLATED != 0;
        #[cfg(not(feature = "x86"))]
        if x86 {
            return Err(Error::unsupported(
                "stream uses x86 preprocessing, rebuild with the `x86` feature",
            ));
        }

        self.roq.reset();
        let mut r = BitReader::new(&input[1..]);
        let mut produced = 0usize;
        while produced < output.len() {
            decode_block(&mut r, output, &mut produced, &mut self.roq, &mut self.scratch)?;
        }
        debug_assert_eq!(produced, output.len());

        #[cfg(feature = "x86")]
        if x86 {
            crate::x86::decode_x86(output);
        }
        let _ = x86;

        Ok(produced)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Compressor;
    use xpack_core::CompressionLevel;

    fn compress_sample() -> (Vec<u8>, Vec<u8>) {
        let data = b"sample sample sample sample, with a tail of text. ".repeat(30);
        let mut c = Compressor::new(data.len(), CompressionLevel::Default).unwrap();
        let mut out = vec![0u8; crate::max_compressed_size(data.len())];
        let written = c.compress(&data, &mut out);
        assert!(written > 0);
        out.truncate(written);
        (data, out)
    }

    #[test]
    fn test_empty_stream_empty_output() {
        let mut d = Decompressor::new();
        assert_eq!(d.decompress(&[], &mut []).unwrap(), 0);
    }

    #[test]
    fn test_empty_stream_nonempty_output_fails() {
        let mut d = Decompressor::new();
        let mut out = vec![0u8; 4];
        assert!(d.decompress(&[], &mut out).is_err());
    }

    #[test]
    fn test_unknown_flags_rejected() {
        let mut d = Decompressor::new();
        let mut out = vec![0u8; 4];
        assert!(d.decompress(&[0x80, 0, 0, 0], &mut out).is_err());
    }

    #[test]
    fn test_truncation_always_fails_cleanly() {
        let (data, stream) = compress_sample();
        let mut d = Decompressor::new();
        for cut in 0..stream.len() {
            let mut out = vec![0u8; data.len()];
            let result = d.decompress(&stream[..cut], &mut out);
            assert!(
                result.is_err(),
                "truncation at {} of {} decoded successfully",
                cut,
                stream.len()
            );
        }
    }

    #[test]
    fn test_bit_flips_never_panic() {
        let (data, stream) = compress_sample();
        let mut d = Decompressor::new();
        // Deterministic probe positions across the stream.
        for i in 0..100 {
            let pos = (i * 31 + 7) % stream.len();
            let bit = i % 8;
            let mut mutated = stream.clone();
            mutated[pos] ^= 1 << bit;

            let mut out = vec![0u8; data.len()];
            match d.decompress(&mutated, &mut out) {
                Ok(n) => {
                    // A surviving decode must still respect the length
                    // contract; the content may legitimately differ.
                    assert_eq!(n, data.len());
                }
                Err(_) => {}
            }
        }
    }

    #[test]
    fn test_wrong_expected_length_fails() {
        let (data, stream) = compress_sample();
        let mut d = Decompressor::new();

        // Expecting less output than the stream produces.
        let mut short = vec![0u8; data.len() - 1];
        assert!(d.decompress(&stream, &mut short).is_err());

        // Expecting more output than the stream carries.
        let mut long = vec![0u8; data.len() + 1];
        assert!(d.decompress(&stream, &mut long).is_err());
    }

    #[test]
    fn test_decompressor_is_reusable_after_errors() {
        let (data, stream) = compress_sample();
        let mut d = Decompressor::new();

        let mut out = vec![0u8; data.len()];
        assert!(d.decompress(&stream[..stream.len() / 2], &mut out).is_err());
        let n = d.decompress(&stream, &mut out).unwrap();
        assert_eq!(n, data.len());
        assert_eq!(out, data);
    }
}
