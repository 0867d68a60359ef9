//! Core type definitions for compression operations.

use crate::error::{Error, Result};

/// Lowest supported compression level.
pub const MIN_LEVEL: u8 = 1;

/// Highest supported compression level.
pub const MAX_LEVEL: u8 = 9;

/// Compression level presets.
///
/// XPACK levels run 1 (fastest) through 9 (best ratio). The presets map onto
/// that range; `Custom` carries an explicit numeric level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionLevel {
    /// Optimized for speed over ratio (level 1).
    Fast,

    /// Balanced speed and ratio (level 6, default).
    #[default]
    Default,

    /// Optimized for ratio over speed (level 9).
    Best,

    /// Explicit numeric level (1-9).
    Custom(u8),
}

impl CompressionLevel {
    /// Convert to the numeric level used by the codec.
    pub fn to_level(self) -> u8 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Default => 6,
            CompressionLevel::Best => 9,
            CompressionLevel::Custom(level) => level,
        }
    }

    /// Create from a numeric level.
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => CompressionLevel::Fast,
            6 => CompressionLevel::Default,
            9 => CompressionLevel::Best,
            other => CompressionLevel::Custom(other),
        }
    }

    /// Validate the level falls in the supported range.
    pub fn validated(self) -> Result<u8> {
        let level = self.to_level();
        if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            Ok(level)
        } else {
            Err(Error::InvalidLevel {
                level: level as i32,
                min: MIN_LEVEL as i32,
                max: MAX_LEVEL as i32,
            })
        }
    }
}

/// Compression ratio metrics.
#[derive(Debug, Clone, Copy)]
pub struct CompressionRatio {
    /// Original uncompressed size in bytes.
    pub original_size: usize,
    /// Compressed size in bytes.
    pub compressed_size: usize,
}

impl CompressionRatio {
    /// Create new ratio from sizes.
    pub fn new(original: usize, compressed: usize) -> Self {
        CompressionRatio {
            original_size: original,
            compressed_size: compressed,
        }
    }

    /// Calculate ratio (original / compressed).
    /// Higher is better (more compression).
    pub fn ratio(&self) -> f64 {
        if self.compressed_size == 0 {
            return 0.0;
        }
        self.original_size as f64 / self.compressed_size as f64
    }

    /// Calculate space savings as percentage (0-100).
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (1.0 - (self.compressed_size as f64 / self.original_size as f64)) * 100.0
    }

    /// Check if compression was effective (saved space).
    pub fn is_effective(&self) -> bool {
        self.compressed_size < self.original_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_roundtrip() {
        for level in MIN_LEVEL..=MAX_LEVEL {
            assert_eq!(CompressionLevel::from_level(level).to_level(), level);
        }
    }

    #[test]
    fn test_level_validation() {
        assert!(CompressionLevel::Custom(0).validated().is_err());
        assert!(CompressionLevel::Custom(10).validated().is_err());
        assert_eq!(CompressionLevel::Default.validated().unwrap(), 6);
    }

    #[test]
    fn test_ratio_math() {
        let r = CompressionRatio::new(1000, 250);
        assert!((r.ratio() - 4.0).abs() < 1e-9);
        assert!((r.savings_percent() - 75.0).abs() < 1e-9);
        assert!(r.is_effective());
        assert!(!CompressionRatio::new(10, 10).is_effective());
    }
}
