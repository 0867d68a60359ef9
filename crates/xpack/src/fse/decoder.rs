//! FSE stream decoding.

use super::table::FseTable;
use crate::bitio::BitReader;
use xpack_core::Result;

/// Forward-reading FSE decoder over one stream.
///
/// The caller drives the symbol/update cadence: `symbol()` reads the current
/// entry, `update()` consumes the transition bits. The update after a
/// stream's final symbol is skipped on both sides of the codec, so the
/// driver must know the symbol count up front (it always does: counts come
/// from the block header).
#[derive(Debug)]
pub struct FseDecoder<'a> {
    table: &'a FseTable,
    state: usize,
}

impl<'a> FseDecoder<'a> {
    /// Create a decoder over `table` with an uninitialized state.
    pub fn new(table: &'a FseTable) -> Self {
        Self { table, state: 0 }
    }

    /// Read the initial state from the stream.
    pub fn init(&mut self, r: &mut BitReader<'_>) -> Result<()> {
        self.state = r.get(u32::from(self.table.table_log()))? as usize;
        Ok(())
    }

    /// The symbol decoded by the current state.
    #[inline]
    pub fn symbol(&self) -> u8 {
        self.table.entry(self.state).symbol
    }

    /// Consume the transition bits and advance to the next state.
    #[inline]
    pub fn update(&mut self, r: &mut BitReader<'_>) -> Result<()> {
        let e = self.table.entry(self.state);
        let add = r.get(u32::from(e.num_bits))?;
        self.state = usize::from(e.baseline) + add as usize;
        Ok(())
    }

    /// Current state, for tests.
    #[cfg(test)]
    pub fn state(&self) -> usize {
        self.state
    }
}
