//! Compression driver.
//!
//! A `Compressor` owns every scratch structure the pipeline needs (hash
//! tables, chain links, sequence staging, block serialization buffers) and
//! reuses them across calls; `compress` itself performs no fresh
//! allocation beyond growing those buffers on first use.
//!
//! The parser walks the input once, asking the match finder for a
//! candidate at each position. Greedy parsing (low levels) takes every
//! acceptable match; lazy parsing defers a match when the next position
//! matches longer, with a small bias toward recent-offset hits; the
//! two-step variant at the top levels peeks one further position before
//! committing.

use crate::block::{
    encode_block, BlockScratch, Sequence, MAX_BLOCK_INPUT, MAX_BLOCK_LITERALS, MAX_BLOCK_SEQUENCES,
};
use crate::lz::{params_for_level, Match, MatchFinder, ParserKind, ParserParams, RecentOffsets};
use crate::MAX_BUFFER_SIZE;
use xpack_core::{CompressionLevel, Error, Result};

/// Window clamp: smallest and largest supported back-reference distance.
const MIN_WINDOW_SIZE: u32 = 1 << 12;
const MAX_WINDOW_SIZE: u32 = 1 << 26;

/// Chain matches this short at this distance cost more than their
/// literals; skip them.
const FAR_MATCH_MIN_OFFSET: u32 = 16_384;

/// XPACK compressor.
///
/// Long-lived: allocate once with the largest buffer it will see, then
/// feed it any number of buffers. Not safe for concurrent use; drive one
/// instance per thread.
#[derive(Debug)]
pub struct Compressor {
    level: u8,
    params: ParserParams,
    max_buffer_size: usize,
    finder: MatchFinder,
    roq: RecentOffsets,
    seqs: Vec<Sequence>,
    lits: Vec<u8>,
    block_scratch: BlockScratch,
    out_buf: Vec<u8>,
    #[cfg(feature = "x86")]
    x86_buf: Vec<u8>,
    #[cfg(feature = "x86")]
    x86_enabled: bool,
}

impl Compressor {
    /// Create a compressor for buffers up to `max_buffer_size` bytes.
    pub fn new(max_buffer_size: usize, level: CompressionLevel) -> Result<Self> {
        let level = level.validated()?;
        if max_buffer_size == 0 || max_buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::unsupported(format!(
                "max buffer size {} outside supported range",
                max_buffer_size
            )));
        }
        let params = params_for_level(level);
        let window_size = (max_buffer_size as u32)
            .next_power_of_two()
            .clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE);
        Ok(Self {
            level,
            params,
            max_buffer_size,
            finder: MatchFinder::new(max_buffer_size, window_size, &params),
            roq: RecentOffsets::new(),
            seqs: Vec::with_capacity(1 << 12),
            lits: Vec::with_capacity(MAX_BLOCK_LITERALS.min(max_buffer_size) + 1),
            block_scratch: BlockScratch::new(),
            out_buf: Vec::with_capacity(max_buffer_size / 2 + 256),
            #[cfg(feature = "x86")]
            x86_buf: Vec::new(),
            #[cfg(feature = "x86")]
            x86_enabled: false,
        })
    }

    /// The configured compression level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Enable the x86 CALL/JMP displacement preprocessor for subsequent
    /// compress calls. The stream records its use; decoders built without
    /// the `x86` feature will refuse such streams.
    #[cfg(feature = "x86")]
    pub fn set_x86_translation(&mut self, enabled: bool) {
        self.x86_enabled = enabled;
    }

    /// Compress `input` into `output`.
    ///
    /// Returns the number of bytes written, or 0 when the compressed
    /// stream would meet or exceed `output.len()` (store the input raw
    /// instead). Never writes past `output.len()`.
    pub fn compress(&mut self, input: &[u8], output: &mut [u8]) -> usize {
        if input.is_empty() || input.len() > self.max_buffer_size {
            return 0;
        }
        match self.compress_inner(input, output.len()) {
            Ok(true) => {
                output[..self.out_buf.len()].copy_from_slice(&self.out_buf);
                self.out_buf.len()
            }
            _ => 0,
        }
    }

    fn compress_inner(&mut self, input: &[u8], capacity: usize) -> Result<bool> {
        #[cfg(feature = "x86")]
        if self.x86_enabled {
            // Move the scratch out so the translated copy can be parsed
            // while `self` stays mutably borrowable.
            let mut translated = std::mem::take(&mut self.x86_buf);
            translated.clear();
            translated.extend_from_slice(input);
            crate::x86::encode_x86(&mut translated);
            let result = self.compress_stream(&translated, capacity);
            self.x86_buf = translated;
            return result;
        }

        self.compress_stream(input, capacity)
    }

    fn compress_stream(&mut self, input: &[u8], capacity: usize) -> Result<bool> {
        self.out_buf.clear();
        self.out_buf.push(self.flags_byte());
        self.finder.reset();
        self.roq.reset();

        let mut pos = 0;
        while pos < input.len() {
            let block_start = pos;
            let roq_snapshot = self.roq;
            pos = self.parse_block(input, pos);
            debug_assert!(pos > block_start);

            // Split borrows: the parse staging feeds the block encoder.
            let roq_after = encode_block(
                &mut self.out_buf,
                &input[block_start..pos],
                &self.lits,
                &self.seqs,
                roq_snapshot,
                &mut self.block_scratch,
            )?;
            self.roq = roq_after;

            if self.out_buf.len() >= capacity {
                return Ok(false);
            }
        }
        Ok(self.out_buf.len() < capacity)
    }

    fn flags_byte(&self) -> u8 {
        #[cfg(feature = "x86")]
        if self.x86_enabled {
            return crate::stream_flags::X86_TRANSLATED;
        }
        0
    }

    /// Parse one block's worth of input starting at `start`; fills
    /// `self.lits` / `self.seqs` and returns the end position.
    fn parse_block(&mut self, input: &[u8], start: usize) -> usize {
        self.seqs.clear();
        self.lits.clear();

        let end = input.len();
        let block_cap = start + (MAX_BLOCK_INPUT - crate::lz::MAX_MATCH);
        let mut pos = start;
        let mut cursor = start; // next position to insert into the chains
        let mut lit_run: u32 = 0;

        while pos < end {
            if self.seqs.len() >= MAX_BLOCK_SEQUENCES
                || self.lits.len() >= MAX_BLOCK_LITERALS
                || pos >= block_cap
            {
                break;
            }

            // Bring the chains up to date for this position.
            while cursor < pos {
                self.finder.insert(input, cursor);
                cursor += 1;
            }

            let candidate = self.find_worthwhile(input, pos);
            let chosen = match (candidate, self.params.parser) {
                (None, _) => None,
                (Some(m), ParserKind::Greedy) => Some(m),
                (Some(m), ParserKind::Lazy) => self.lazy_choice(input, pos, m, &mut cursor, false),
                (Some(m), ParserKind::Lazy2) => self.lazy_choice(input, pos, m, &mut cursor, true),
            };

            match chosen {
                Some(m) => {
                    self.seqs.push(Sequence {
                        lit_run,
                        match_len: m.length,
                        offset: m.offset,
                    });
                    lit_run = 0;
                    match self.roq.match_slot(m.offset) {
                        Some(slot) => self.roq.promote(slot),
                        None => self.roq.push(m.offset),
                    }
                    pos += m.length as usize;
                }
                None => {
                    self.lits.push(input[pos]);
                    lit_run += 1;
                    pos += 1;
                }
            }
        }

        pos
    }

    /// Ask the finder for a match and drop bargains that cost more than
    /// their literals.
    fn find_worthwhile(&self, input: &[u8], pos: usize) -> Option<Match> {
        let m = self.finder.find(input, pos, &self.roq)?;
        if m.length == 3
            && m.offset > FAR_MATCH_MIN_OFFSET
            && self.roq.match_slot(m.offset).is_none()
        {
            return None;
        }
        Some(m)
    }

    /// Lazy evaluation: emit `m0` unless a following position matches
    /// strictly longer. Recent-offset hits get one point of stickiness.
    fn lazy_choice(
        &mut self,
        input: &[u8],
        pos: usize,
        m0: Match,
        cursor: &mut usize,
        two_step: bool,
    ) -> Option<Match> {
        if m0.length >= self.params.good_len || pos + 1 >= input.len() {
            return Some(m0);
        }

        let bias = if self.roq.match_slot(m0.offset).is_some() {
            1
        } else {
            0
        };

        // The lookahead position must be in the chains before probing.
        while *cursor <= pos {
            self.finder.insert(input, *cursor);
            *cursor += 1;
        }
        let m1 = self.find_worthwhile(input, pos + 1);
        if let Some(m1) = m1 {
            if m1.length > m0.length + bias {
                return None; // defer: emit a literal at pos
            }
        }

        if two_step && pos + 2 < input.len() {
            while *cursor <= pos + 1 {
                self.finder.insert(input, *cursor);
                *cursor += 1;
            }
            if let Some(m2) = self.find_worthwhile(input, pos + 2) {
                if m2.length > m0.length + bias + 1 {
                    return None;
                }
            }
        }

        Some(m0)
    }
}

// =============================================================================
// Tests
// =============================================================================
