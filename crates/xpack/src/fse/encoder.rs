//! FSE stream encoding.
//!
//! Encoding runs the decode-table transitions backwards: symbols are
//! processed last-to-first, and for each symbol the encoder picks the unique
//! table state that transitions into the already-chosen state of the
//! following symbol, emitting the transition's low bits. The collected
//! `(value, nbits)` chunks are then written in reverse, which is exactly the
//! order the forward-reading decoder consumes them in.
//!
//! The chunk vector is shared with the raw extra-bits fields of the block
//! sequence stream, so interleaved streams come out of a single reversal.

use super::table::FseTable;

/// Per-symbol state index derived from a decode table.
///
/// For a symbol with normalized count `q`, `states[first[s] + k]` is the
/// table state whose occurrence value is `q + k`; the forward table walk
/// hands these out in ascending state order.
#[derive(Debug, Clone, Default)]
pub struct FseEncodeTable {
    first: Vec<u32>,
    states: Vec<u16>,
    counts: Vec<u16>,
    table_log: u8,
}

impl FseEncodeTable {
    /// Build the encode view of a decode table, reusing storage.
    pub fn rebuild(&mut self, table: &FseTable) {
        let normalized = table.normalized();
        self.table_log = table.table_log();
        self.counts.clear();
        self.counts.extend_from_slice(normalized);

        self.first.clear();
        let mut offset = 0u32;
        for &count in normalized {
            self.first.push(offset);
            offset += u32::from(count);
        }

        self.states.clear();
        self.states.resize(table.size(), 0);
        let mut fill: Vec<u32> = self.first.clone();
        for state in 0..table.size() {
            let symbol = table.entry(state).symbol as usize;
            self.states[fill[symbol] as usize] = state as u16;
            fill[symbol] += 1;
        }
    }

    /// Build a fresh encode view.
    pub fn new(table: &FseTable) -> Self {
        let mut enc = Self::default();
        enc.rebuild(table);
        enc
    }

    /// The table log.
    #[inline]
    pub fn table_log(&self) -> u8 {
        self.table_log
    }
}

/// State machine for one FSE stream, fed symbols in reverse order.
#[derive(Debug, Clone, Copy)]
pub struct FseStreamEncoder {
    target: Option<u16>,
}

impl FseStreamEncoder {
    /// Start a stream with no successor symbol yet.
    pub fn new() -> Self {
        Self { target: None }
    }

    /// Feed the next symbol (walking the stream backwards). Pushes the
    /// transition chunk the decoder will read after decoding this symbol;
    /// the stream's final symbol produces no chunk.
    #[inline]
    pub fn push(&mut self, table: &FseEncodeTable, symbol: u8, chunks: &mut Vec<(u32, u8)>) {
        let q = u32::from(table.counts[symbol as usize]);
        debug_assert!(q > 0, "encoding a symbol with zero normalized count");
        let base = table.first[symbol as usize] as usize;

        match self.target {
            None => {
                // Final symbol of the stream: any state decoding to it
                // works; take the lowest.
                self.target = Some(table.states[base]);
            }
            Some(t) => {
                let size = 1u32 << table.table_log;
                let u = u32::from(t) + size;
                let mut nb = 0u32;
                while (u >> nb) >= 2 * q {
                    nb += 1;
                }
                let v = u >> nb;
                let state = table.states[base + (v - q) as usize];
                let mask = (1u32 << nb) - 1;
                chunks.push((u & mask, nb as u8));
                self.target = Some(state);
            }
        }
    }

    /// The initial state the decoder must start from, once every symbol has
    /// been pushed. `None` when the stream was empty.
    #[inline]
    pub fn initial_state(&self) -> Option<u16> {
        self.target
    }
}

impl Default for FseStreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
