//! Per-level match finding and parsing parameters.

/// Parsing strategy selected by the compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Take every acceptable match immediately.
    Greedy,
    /// Defer a match when the next position matches longer.
    Lazy,
    /// Like `Lazy`, with a second one-position lookahead.
    Lazy2,
}

/// Tunables for one compression level.
#[derive(Debug, Clone, Copy)]
pub struct ParserParams {
    /// log2 of the 4-byte hash head table size.
    pub hash_log: u32,
    /// Whether the single-entry 3-byte hash table is consulted.
    pub use_hash3: bool,
    /// Maximum hash-chain walk depth.
    pub depth: u32,
    /// Match length at which the lazy parser commits without lookahead.
    pub good_len: u32,
    /// Match length at which the chain walk stops early.
    pub nice_len: u32,
    /// Parsing strategy.
    pub parser: ParserKind,
}

/// Look up the tunables for a level in 1..=9.
pub fn params_for_level(level: u8) -> ParserParams {
    use ParserKind::*;
    let (hash_log, use_hash3, depth, good_len, nice_len, parser) = match level {
        1 => (14, false, 4, 8, 16, Greedy),
        2 => (14, false, 8, 8, 32, Greedy),
        3 => (15, false, 16, 16, 48, Greedy),
        4 => (15, false, 16, 16, 64, Lazy),
        5 => (15, false, 32, 32, 96, Lazy),
        6 => (16, true, 64, 32, 128, Lazy),
        7 => (16, true, 128, 64, 192, Lazy),
        8 => (16, true, 512, 96, 288, Lazy2),
        _ => (16, true, 1024, 128, 512, Lazy2),
    };
    ParserParams {
        hash_log,
        use_hash3,
        depth,
        good_len,
        nice_len,
        parser,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_grows_with_level() {
        let mut prev = 0;
        for level in 1..=9 {
            let p = params_for_level(level);
            assert!(p.depth >= prev, "depth regressed at level {}", level);
            prev = p.depth;
            assert!(p.good_len <= p.nice_len);
            assert!(p.hash_log >= 14 && p.hash_log <= 16);
        }
    }

    #[test]
    fn test_parser_progression() {
        assert_eq!(params_for_level(1).parser, ParserKind::Greedy);
        assert_eq!(params_for_level(6).parser, ParserKind::Lazy);
        assert_eq!(params_for_level(9).parser, ParserKind::Lazy2);
    }
}
