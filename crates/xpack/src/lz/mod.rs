//! LZ77 primitives: sliding-window match finding, per-level tunables, and
//! the recent-offsets queue.

mod matchfinder;
mod params;
mod recent;

pub use matchfinder::{match_length, Match, MatchFinder, MAX_MATCH, MIN_CHAIN_MATCH, MIN_MATCH};
pub use params::{params_for_level, ParserKind, ParserParams};
pub use recent::{RecentOffsets, RECENT_OFFSET_COUNT};
