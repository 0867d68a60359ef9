//! Block encoding.
//!
//! A block is serialized to a scratch buffer first, then either that body or
//! the raw input bytes are emitted, whichever is smaller. The common header
//! (mode, input length, sequence count, literal count) is bit-packed and
//! byte-aligned so the body can be appended as whole bytes.

use super::codes::{
    length_code, offset_code, ALIGNED_NUM_SYMBOLS, ALIGNED_TABLE_MAX_LOG, FIRST_ALIGNED_CODE,
    FIRST_VERBATIM_CODE, LENGTH_NUM_SYMBOLS, LENGTH_TABLE_MAX_LOG, LITERAL_TABLE_MAX_LOG,
    OFFSET_NUM_SYMBOLS, OFFSET_TABLE_MAX_LOG,
};
use super::{Sequence, MODE_ALIGNED, MODE_UNCOMPRESSED, MODE_VERBATIM};
use crate::bitio::BitWriter;
use crate::fse::{
    estimate_stream_bits, normalize_counts, FseEncodeTable, FseStreamEncoder, FseTable,
};
use crate::lz::RecentOffsets;
use xpack_core::Result;

/// Minimum aligned-eligible offsets before aligned mode is considered.
const ALIGNED_MIN_COUNT: usize = 32;

/// Fixed overhead charged against the aligned stream (table header plus
/// initial state) when estimating its worth, in bits.
const ALIGNED_OVERHEAD_BITS: u64 = 96;

/// One sequence with its stream symbols resolved.
#[derive(Debug, Clone, Copy, Default)]
struct ResolvedSeq {
    ll_code: u8,
    ll_bits: u8,
    ll_extra: u32,
    ml_code: u8,
    ml_bits: u8,
    ml_extra: u32,
    off_code: u8,
    off_bits: u8,
    off_extra: u32,
}

/// Reusable encoder-side staging buffers, allocated once per compressor.
#[derive(Debug)]
pub struct BlockScratch {
    resolved: Vec<ResolvedSeq>,
    chunks: Vec<(u32, u8)>,
    body: Vec<u8>,
    aligned_vals: Vec<u8>,
    lit_freqs: [u32; 256],
    len_freqs: [u32; LENGTH_NUM_SYMBOLS],
    off_freqs: [u32; OFFSET_NUM_SYMBOLS],
    aligned_freqs: [u32; ALIGNED_NUM_SYMBOLS],
    lit_table: FseTable,
    len_table: FseTable,
    off_table: FseTable,
    aligned_table: FseTable,
    lit_enc: FseEncodeTable,
    len_enc: FseEncodeTable,
    off_enc: FseEncodeTable,
    aligned_enc: FseEncodeTable,
}

impl BlockScratch {
    /// Allocate staging buffers sized for a typical block.
    pub fn new() -> Self {
        Self {
            resolved: Vec::with_capacity(1 << 12),
            chunks: Vec::with_capacity(1 << 14),
            body: Vec::with_capacity(1 << 16),
            aligned_vals: Vec::with_capacity(1 << 10),
            lit_freqs: [0; 256],
            len_freqs: [0; LENGTH_NUM_SYMBOLS],
            off_freqs: [0; OFFSET_NUM_SYMBOLS],
            aligned_freqs: [0; ALIGNED_NUM_SYMBOLS],
            lit_table: FseTable::default(),
            len_table: FseTable::default(),
            off_table: FseTable::default(),
            aligned_table: FseTable::default(),
            lit_enc: FseEncodeTable::default(),
            len_enc: FseEncodeTable::default(),
            off_enc: FseEncodeTable::default(),
            aligned_enc: FseEncodeTable::default(),
        }
    }
}

impl Default for BlockScratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode one block onto `out` (which must be byte-aligned).
///
/// `raw` is the stretch of input the block covers; `literals` and `seqs`
/// are the parse of it. `roq` is the queue state at block entry; the
/// returned queue is the state a decoder will hold after this block
/// (unchanged when the block falls back to uncompressed storage).
pub fn encode_block(
    out: &mut Vec<u8>,
    raw: &[u8],
    literals: &[u8],
    seqs: &[Sequence],
    roq: RecentOffsets,
    scratch: &mut BlockScratch,
) -> Result<RecentOffsets> {
    debug_assert!(!raw.is_empty());
    debug_assert!(raw.len() == literals.len() + seqs.iter().map(|s| s.match_len as usize).sum::<usize>());

    // ------------------------------------------------------------------
    // Resolve sequences against the queue and tally frequencies.
    // ------------------------------------------------------------------
    scratch.resolved.clear();
    scratch.lit_freqs.fill(0);
    scratch.len_freqs.fill(0);
    scratch.off_freqs.fill(0);
    scratch.aligned_freqs.fill(0);
    scratch.aligned_vals.clear();

    let mut roq_out = roq;
    for seq in seqs {
        let (ll_code, ll_bits, ll_extra) = length_code(seq.lit_run);
        let (ml_code, ml_bits, ml_extra) = length_code(seq.match_len - 2);
        let (off_code, off_bits, off_extra) = match roq_out.match_slot(seq.offset) {
            Some(slot) => {
                roq_out.promote(slot);
                (slot as u8, 0, 0)
            }
            None => {
                roq_out.push(seq.offset);
                offset_code(seq.offset)
            }
        };
        scratch.len_freqs[ll_code as usize] += 1;
        scratch.len_freqs[ml_code as usize] += 1;
        scratch.off_freqs[off_code as usize] += 1;
        if off_code >= FIRST_ALIGNED_CODE {
            let low = (off_extra & 7) as u8;
            scratch.aligned_vals.push(low);
            scratch.aligned_freqs[low as usize] += 1;
        }
        scratch.resolved.push(ResolvedSeq {
            ll_code,
            ll_bits,
            ll_extra,
            ml_code,
            ml_bits,
            ml_extra,
            off_code,
            off_bits,
            off_extra,
        });
    }
    for &b in literals {
        scratch.lit_freqs[b as usize] += 1;
    }

    // ------------------------------------------------------------------
    // Decide aligned mode: worthwhile only when enough offsets feed the
    // aligned stream and their low bits are skewed enough to beat 3 raw
    // bits apiece.
    // ------------------------------------------------------------------
    let aligned_count = scratch.aligned_vals.len();
    let mut aligned_mode = false;
    if aligned_count >= ALIGNED_MIN_COUNT {
        let (norm, log) = normalize_counts(&scratch.aligned_freqs, ALIGNED_TABLE_MAX_LOG)?;
        let est = estimate_stream_bits(&scratch.aligned_freqs, &norm, log) + ALIGNED_OVERHEAD_BITS;
        if est < 3 * aligned_count as u64 {
            scratch.aligned_table.rebuild(&norm, log)?;
            scratch.aligned_enc.rebuild(&scratch.aligned_table);
            aligned_mode = true;
        }
    }

    // ------------------------------------------------------------------
    // Build the tables in use.
    // ------------------------------------------------------------------
    if !literals.is_empty() {
        let (norm, log) = normalize_counts(&scratch.lit_freqs, LITERAL_TABLE_MAX_LOG)?;
        scratch.lit_table.rebuild(&norm, log)?;
        scratch.lit_enc.rebuild(&scratch.lit_table);
    }
    if !seqs.is_empty() {
        let (norm, log) = normalize_counts(&scratch.len_freqs, LENGTH_TABLE_MAX_LOG)?;
        scratch.len_table.rebuild(&norm, log)?;
        scratch.len_enc.rebuild(&scratch.len_table);
        let (norm, log) = normalize_counts(&scratch.off_freqs, OFFSET_TABLE_MAX_LOG)?;
        scratch.off_table.rebuild(&norm, log)?;
        scratch.off_enc.rebuild(&scratch.off_table);
    }

    // ------------------------------------------------------------------
    // Serialize the body to scratch.
    // ------------------------------------------------------------------
    scratch.body.clear();
    let mut w = BitWriter::new(&mut scratch.body);

    if !literals.is_empty() {
        scratch.lit_table.write_header(&mut w);
    }
    if !seqs.is_empty() {
        scratch.len_table.write_header(&mut w);
        scratch.off_table.write_header(&mut w);
    }
    if aligned_mode {
        scratch.aligned_table.write_header(&mut w);
    }

    // Literal stream: two interleaved states over one table.
    scratch.chunks.clear();
    let mut lit_streams = [FseStreamEncoder::new(), FseStreamEncoder::new()];
    for j in (0..literals.len()).rev() {
        lit_streams[j & 1].push(&scratch.lit_enc, literals[j], &mut scratch.chunks);
    }
    let lit_log = u32::from(scratch.lit_table.table_log());
    if let Some(state) = lit_streams[0].initial_state() {
        w.put(u32::from(state), lit_log);
    }
    if let Some(state) = lit_streams[1].initial_state() {
        w.put(u32::from(state), lit_log);
    }
    for &(v, n) in scratch.chunks.iter().rev() {
        w.put(v, u32::from(n));
    }

    // Sequence stream: length codes, offset codes, and extra bits,
    // interleaved per emission.
    scratch.chunks.clear();
    let mut len_stream = FseStreamEncoder::new();
    let mut off_stream = FseStreamEncoder::new();
    for r in scratch.resolved.iter().rev() {
        off_stream.push(&scratch.off_enc, r.off_code, &mut scratch.chunks);
        if r.off_code >= FIRST_VERBATIM_CODE {
            if aligned_mode && r.off_code >= FIRST_ALIGNED_CODE {
                scratch.chunks.push((r.off_extra >> 3, r.off_bits - 3));
            } else {
                scratch.chunks.push((r.off_extra, r.off_bits));
            }
        }
        len_stream.push(&scratch.len_enc, r.ml_code, &mut scratch.chunks);
        scratch.chunks.push((r.ml_extra, r.ml_bits));
        len_stream.push(&scratch.len_enc, r.ll_code, &mut scratch.chunks);
        scratch.chunks.push((r.ll_extra, r.ll_bits));
    }
    if !seqs.is_empty() {
        let len_log = u32::from(scratch.len_table.table_log());
        let off_log = u32::from(scratch.off_table.table_log());
        w.put(u32::from(len_stream.initial_state().unwrap_or(0)), len_log);
        w.put(u32::from(off_stream.initial_state().unwrap_or(0)), off_log);
        for &(v, n) in scratch.chunks.iter().rev() {
            w.put(v, u32::from(n));
        }
    }

    // Aligned tail, byte-aligned at the end of the block.
    if aligned_mode {
        w.align_to_byte();
        scratch.chunks.clear();
        let mut al_stream = FseStreamEncoder::new();
        for &v in scratch.aligned_vals.iter().rev() {
            al_stream.push(&scratch.aligned_enc, v, &mut scratch.chunks);
        }
        let al_log = u32::from(scratch.aligned_table.table_log());
        w.put(u32::from(al_stream.initial_state().unwrap_or(0)), al_log);
        for &(v, n) in scratch.chunks.iter().rev() {
            w.put(v, u32::from(n));
        }
    }
    w.finish();

    // ------------------------------------------------------------------
    // Emit whichever form is smaller.
    // ------------------------------------------------------------------
    let mut hw = BitWriter::new(out);
    if scratch.body.len() >= raw.len() {
        hw.put(MODE_UNCOMPRESSED, 2);
        hw.put(raw.len() as u32, 24);
        hw.put(0, 24);
        hw.put(0, 24);
        hw.align_to_byte();
        hw.write_bytes(raw);
        hw.finish();
        // The decoder sees no sequences, so its queue stays put.
        return Ok(roq);
    }

    let mode = if aligned_mode {
        MODE_ALIGNED
    } else {
        MODE_VERBATIM
    };
    hw.put(mode, 2);
    hw.put(raw.len() as u32, 24);
    hw.put(seqs.len() as u32, 24);
    hw.put(literals.len() as u32, 24);
    hw.align_to_byte();
    hw.write_bytes(&scratch.body);
    hw.finish();
    Ok(roq_out)
}
