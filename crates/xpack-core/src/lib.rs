//! # XPACK Core
//!
//! Shared types for the XPACK compression library: the error enum, the
//! compression-level and ratio types, one-shot codec traits, and the
//! statistics structs used by the benchmark driver.
//!
//! The codec engine itself lives in the `xpack` crate; the container format
//! and command-line tools live in `xpack-cli`. This crate exists so both can
//! agree on error and level semantics without depending on each other.

pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use stats::CompressionStats;
pub use traits::{Compressor, Decompressor};
pub use types::{CompressionLevel, CompressionRatio, MAX_LEVEL, MIN_LEVEL};
