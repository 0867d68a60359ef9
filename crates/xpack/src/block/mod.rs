//! Block codec.
//!
//! A block is the unit of entropy coding: it carries its own FSE table
//! headers and symbol streams, and is self-contained apart from the
//! recent-offsets queue and the output window carried across blocks within
//! one codec call. Three modes exist: verbatim, aligned (low offset bits
//! split into a byte-aligned tail stream), and uncompressed.

pub mod codes;
mod decode;
mod encode;

pub use decode::{decode_block, DecodeScratch};
pub use encode::{encode_block, BlockScratch};

/// Block mode field values.
pub const MODE_VERBATIM: u32 = 0;
pub const MODE_ALIGNED: u32 = 1;
pub const MODE_UNCOMPRESSED: u32 = 2;

/// Soft cap on sequences per block.
pub const MAX_BLOCK_SEQUENCES: usize = 32_768;

/// Cap on literal bytes per block (also bounds any literal run).
pub const MAX_BLOCK_LITERALS: usize = 65_535;

/// Cap on input bytes covered by one block.
pub const MAX_BLOCK_INPUT: usize = 1 << 22;

/// One parsed sequence: a run of literals followed by a match.
///
/// The trailing literals of a block have no sequence; they are implied by
/// the literal count in the block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    /// Literals preceding the match.
    pub lit_run: u32,
    /// Match length (>= 2).
    pub match_len: u32,
    /// Match offset (>= 1).
    pub offset: u32,
}

// =============================================================================
// Tests
// =============================================================================
