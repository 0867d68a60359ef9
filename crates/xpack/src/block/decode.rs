//! Block decoding.
//!
//! Compressed blocks are decoded in three phases: the symbol streams are
//! staged into a sequence buffer, aligned blocks then patch the staged
//! offsets from the byte-aligned tail, and finally the sequences are
//! executed against the output buffer. Staging first is what lets the
//! aligned tail live at the end of the block without a length field.

use super::codes::{
    length_base, offset_base, ALIGNED_NUM_SYMBOLS, ALIGNED_TABLE_MAX_LOG, FIRST_ALIGNED_CODE,
    FIRST_VERBATIM_CODE, LENGTH_NUM_SYMBOLS, LENGTH_TABLE_MAX_LOG, LITERAL_TABLE_MAX_LOG,
    OFFSET_NUM_SYMBOLS, OFFSET_TABLE_MAX_LOG,
};
use super::{MAX_BLOCK_INPUT, MAX_BLOCK_LITERALS, MAX_BLOCK_SEQUENCES, MODE_UNCOMPRESSED};
use crate::bitio::BitReader;
use crate::fse::{FseDecoder, FseTable};
use crate::lz::RecentOffsets;
use xpack_core::{Error, Result};

/// A staged sequence awaiting offset resolution and execution.
#[derive(Debug, Clone, Copy)]
struct StagedSeq {
    lit_run: u32,
    match_len: u32,
    off_code: u8,
    /// Verbatim offset value; missing its low 3 bits until the aligned
    /// tail is applied (aligned blocks, codes >= FIRST_ALIGNED_CODE).
    offset: u32,
}

/// Reusable decoder-side staging buffers, allocated once per decompressor.
#[derive(Debug, Default)]
pub struct DecodeScratch {
    lit_buf: Vec<u8>,
    staged: Vec<StagedSeq>,
    lit_table: FseTable,
    len_table: FseTable,
    off_table: FseTable,
    aligned_table: FseTable,
}

impl DecodeScratch {
    /// Allocate staging buffers sized for a typical block.
    pub fn new() -> Self {
        Self {
            lit_buf: Vec::with_capacity(1 << 14),
            staged: Vec::with_capacity(1 << 12),
            ..Self::default()
        }
    }
}

/// Decode one block from `r` into `out` at `*produced`.
///
/// Advances `*produced` by the block's input length and keeps `roq` in
/// step with the encoder. Fails without writing out of bounds on any
/// malformed input.
pub fn decode_block(
    r: &mut BitReader<'_>,
    out: &mut [u8],
    produced: &mut usize,
    roq: &mut RecentOffsets,
    scratch: &mut DecodeScratch,
) -> Result<()> {
    let mode = r.get(2)?;
    let block_len = r.get(24)? as usize;
    let seq_count = r.get(24)? as usize;
    let lit_count = r.get(24)? as usize;
    r.align_to_byte();

    if mode > MODE_UNCOMPRESSED {
        return Err(Error::corrupted_at("bad block mode", r.bytes_consumed()));
    }
    if block_len == 0 || block_len > MAX_BLOCK_INPUT {
        return Err(Error::corrupted("bad block length"));
    }
    if *produced + block_len > out.len() {
        return Err(Error::buffer_too_small(*produced + block_len, out.len()));
    }

    if mode == MODE_UNCOMPRESSED {
        let bytes = r.read_bytes(block_len)?;
        out[*produced..*produced + block_len].copy_from_slice(bytes);
        *produced += block_len;
        return Ok(());
    }

    let aligned = mode == super::MODE_ALIGNED;
    if seq_count > MAX_BLOCK_SEQUENCES || lit_count > MAX_BLOCK_LITERALS {
        return Err(Error::corrupted("block counts out of range"));
    }
    if lit_count > block_len {
        return Err(Error::corrupted("literal count exceeds block length"));
    }

    // Table headers for the alphabets in use.
    if lit_count > 0 {
        scratch
            .lit_table
            .parse_header(r, 256, LITERAL_TABLE_MAX_LOG)?;
    }
    if seq_count > 0 {
        scratch
            .len_table
            .parse_header(r, LENGTH_NUM_SYMBOLS, LENGTH_TABLE_MAX_LOG)?;
        scratch
            .off_table
            .parse_header(r, OFFSET_NUM_SYMBOLS, OFFSET_TABLE_MAX_LOG)?;
    }
    if aligned {
        scratch
            .aligned_table
            .parse_header(r, ALIGNED_NUM_SYMBOLS, ALIGNED_TABLE_MAX_LOG)?;
    }

    // Literal stream: two interleaved states sharing one table.
    scratch.lit_buf.clear();
    if lit_count > 0 {
        let mut even = FseDecoder::new(&scratch.lit_table);
        let mut odd = FseDecoder::new(&scratch.lit_table);
        even.init(r)?;
        if lit_count >= 2 {
            odd.init(r)?;
        }
        for j in 0..lit_count {
            let stream = if j & 1 == 0 { &mut even } else { &mut odd };
            scratch.lit_buf.push(stream.symbol());
            if j + 2 < lit_count {
                stream.update(r)?;
            }
        }
    }

    // Sequence stream, staged.
    scratch.staged.clear();
    if seq_count > 0 {
        let mut len_dec = FseDecoder::new(&scratch.len_table);
        let mut off_dec = FseDecoder::new(&scratch.off_table);
        len_dec.init(r)?;
        off_dec.init(r)?;
        for i in 0..seq_count {
            let (ll_base, ll_bits) = length_base(len_dec.symbol());
            let lit_run = ll_base + r.get(u32::from(ll_bits))?;
            len_dec.update(r)?;

            let (ml_base, ml_bits) = length_base(len_dec.symbol());
            let match_len = ml_base + r.get(u32::from(ml_bits))? + 2;
            if i + 1 < seq_count {
                len_dec.update(r)?;
            }

            let off_code = off_dec.symbol();
            let offset = if off_code >= FIRST_VERBATIM_CODE {
                let (base, bits) = offset_base(off_code);
                if aligned && off_code >= FIRST_ALIGNED_CODE {
                    base + (r.get(u32::from(bits - 3))? << 3)
                } else {
                    base + r.get(u32::from(bits))?
                }
            } else {
                0
            };
            if i + 1 < seq_count {
                off_dec.update(r)?;
            }

            scratch.staged.push(StagedSeq {
                lit_run,
                match_len,
                off_code,
                offset,
            });
        }
    }

    // Aligned tail: patch the low offset bits, in sequence order.
    if aligned {
        r.align_to_byte();
        let eligible = scratch
            .staged
            .iter()
            .filter(|s| s.off_code >= FIRST_ALIGNED_CODE)
            .count();
        if eligible > 0 {
            let mut al_dec = FseDecoder::new(&scratch.aligned_table);
            al_dec.init(r)?;
            let mut seen = 0;
            for seq in scratch
                .staged
                .iter_mut()
                .filter(|s| s.off_code >= FIRST_ALIGNED_CODE)
            {
                seq.offset += u32::from(al_dec.symbol());
                seen += 1;
                if seen < eligible {
                    al_dec.update(r)?;
                }
            }
        }
    }

    // Execute: copy literal runs and back-references, then the trailing
    // literals.
    let start = *produced;
    let mut lit_pos = 0usize;
    for seq in &scratch.staged {
        let offset = if seq.off_code < FIRST_VERBATIM_CODE {
            let slot = usize::from(seq.off_code);
            let o = roq.get(slot);
            roq.promote(slot);
            o
        } else {
            roq.push(seq.offset);
            seq.offset
        };

        let lit_run = seq.lit_run as usize;
        let match_len = seq.match_len as usize;
        if lit_pos + lit_run > scratch.lit_buf.len() {
            return Err(Error::corrupted("literal run exceeds literal buffer"));
        }
        if *produced + lit_run + match_len > out.len() {
            return Err(Error::buffer_too_small(
                *produced + lit_run + match_len,
                out.len(),
            ));
        }
        out[*produced..*produced + lit_run]
            .copy_from_slice(&scratch.lit_buf[lit_pos..lit_pos + lit_run]);
        lit_pos += lit_run;
        *produced += lit_run;

        let off = offset as usize;
        if off == 0 || off > *produced {
            return Err(Error::corrupted_at("match offset out of range", off));
        }
        let src = *produced - off;
        if off >= match_len {
            out.copy_within(src..src + match_len, *produced);
        } else {
            // Overlapping back-reference: the repeating-pattern expansion
            // must read bytes written moments ago.
            for i in 0..match_len {
                out[*produced + i] = out[*produced + i - off];
            }
        }
        *produced += match_len;
    }

    let trailing = scratch.lit_buf.len() - lit_pos;
    if *produced + trailing > out.len() {
        return Err(Error::buffer_too_small(*produced + trailing, out.len()));
    }
    out[*produced..*produced + trailing].copy_from_slice(&scratch.lit_buf[lit_pos..]);
    *produced += trailing;

    if *produced - start != block_len {
        return Err(Error::corrupted(format!(
            "block produced {} bytes, header said {}",
            *produced - start,
            block_len
        )));
    }
    Ok(())
}
