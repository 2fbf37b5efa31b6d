//! Content-defined splitting of in-memory data.
//!
//! The splitter only computes boundaries. It never copies data: callers get
//! `(offset, size)` ranges into the slice they passed in, which for file
//! ingestion is a memory-mapped file.
//!
//! # Example
//!
//! ```
//! use ingestrs::{ChunkConfig, Splitter};
//!
//! let splitter = Splitter::new(ChunkConfig::new(64, 256, 1024)?)?;
//! let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7 + i / 13) as u8).collect();
//! let ranges = splitter.split(&data);
//!
//! assert_eq!(ranges.first().map(|r| r.offset), Some(0));
//! assert_eq!(ranges.last().map(|r| r.end()), Some(data.len() as u64));
//! # Ok::<(), ingestrs::ConfigError>(())
//! ```

use std::fmt;
use std::ops::Range;

use crate::cdc::FastCdc;
use crate::config::ChunkConfig;
use crate::error::ConfigError;

/// A byte range of the input, identified by offset and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkRange {
    /// Offset of the first byte.
    pub offset: u64,
    /// Number of bytes.
    pub size: u64,
}

impl ChunkRange {
    /// Creates a new range.
    pub const fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Returns the end offset (exclusive).
    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Returns the range as a `Range<u64>`.
    pub fn range(&self) -> Range<u64> {
        self.offset..self.end()
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.end())
    }
}

/// Splits data into content-defined chunk ranges.
///
/// # Determinism
///
/// Boundaries depend only on the bytes and the [`ChunkConfig`]: the same
/// input always produces the same ranges, on any machine and from any
/// thread. A splitter holds no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splitter {
    config: ChunkConfig,
}

impl Splitter {
    /// Creates a splitter for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is unusable.
    pub fn new(config: ChunkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the configuration used by this splitter.
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Splits `data` into ranges.
    ///
    /// The ranges are strictly ascending, non-overlapping and cover
    /// `[0, data.len())` exactly. Every range but the last lies within
    /// `[min_size, max_size]`; the last one ends at the end of the data and
    /// may be shorter. Empty input yields no ranges.
    pub fn split(&self, data: &[u8]) -> Vec<ChunkRange> {
        self.ranges(data).collect()
    }

    /// Returns a lazy iterator over the ranges of `data`.
    pub fn ranges<'a>(&self, data: &'a [u8]) -> Ranges<'a> {
        Ranges {
            cdc: FastCdc::new(&self.config),
            data,
            position: 0,
        }
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }
}

/// Iterator over the chunk ranges of a byte slice.
#[derive(Debug, Clone)]
pub struct Ranges<'a> {
    cdc: FastCdc,
    data: &'a [u8],
    position: usize,
}

impl Iterator for Ranges<'_> {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        let remaining = self.data.get(self.position..)?;
        if remaining.is_empty() {
            return None;
        }

        let skip = self.cdc.skippable().min(remaining.len());
        self.cdc.skip(skip);

        // Trailing data forms the last range even below min_size.
        let len = match self.cdc.find_boundary(&remaining[skip..]) {
            Some(n) => skip + n,
            None => remaining.len(),
        };

        let range = ChunkRange::new(self.position as u64, len as u64);
        self.position += len;
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // xorshift64, fixed seed
    fn sample(len: usize) -> Vec<u8> {
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 24) as u8
            })
            .collect()
    }

    fn assert_covers(ranges: &[ChunkRange], len: usize) {
        let mut expected_offset = 0u64;
        for range in ranges {
            assert_eq!(range.offset, expected_offset);
            assert!(range.size > 0);
            expected_offset = range.end();
        }
        assert_eq!(expected_offset, len as u64);
    }

    #[test]
    fn test_empty() {
        let splitter = Splitter::default();
        assert!(splitter.split(&[]).is_empty());
    }

    #[test]
    fn test_small_data() {
        let splitter = Splitter::new(ChunkConfig::new(4, 16, 64).unwrap()).unwrap();
        let ranges = splitter.split(&[0xAA; 3]);
        assert_eq!(ranges, vec![ChunkRange::new(0, 3)]);
    }

    #[test]
    fn test_coverage_and_bounds() {
        let config = ChunkConfig::new(64, 256, 1024).unwrap();
        let splitter = Splitter::new(config).unwrap();
        let data = sample(50_000);
        let ranges = splitter.split(&data);

        assert!(ranges.len() > 1);
        assert_covers(&ranges, data.len());

        let (last, rest) = ranges.split_last().unwrap();
        for range in rest {
            assert!(range.size >= config.min_size() as u64);
            assert!(range.size <= config.max_size() as u64);
        }
        assert!(last.size <= config.max_size() as u64);
    }

    #[test]
    fn test_uniform_data_forced_at_max() {
        let config = ChunkConfig::new(16, 32, 64).unwrap();
        let splitter = Splitter::new(config).unwrap();
        let ranges = splitter.split(&[0u8; 1000]);

        assert_covers(&ranges, 1000);
        assert!(ranges.iter().all(|r| r.size <= 64));
    }

    #[test]
    fn test_determinism() {
        let splitter = Splitter::new(ChunkConfig::new(64, 256, 1024).unwrap()).unwrap();
        let data = sample(20_000);

        assert_eq!(splitter.split(&data), splitter.split(&data));
        let fresh = Splitter::new(*splitter.config()).unwrap();
        assert_eq!(splitter.split(&data), fresh.split(&data.clone()));
    }

    #[test]
    fn test_prefix_edit_resynchronizes() {
        let splitter = Splitter::new(ChunkConfig::new(64, 256, 1024).unwrap()).unwrap();
        let data = sample(40_000);
        let mut edited = data.clone();
        edited[100] ^= 0xFF;

        let original: Vec<u64> = splitter.split(&data).iter().map(|r| r.end()).collect();
        let changed: Vec<u64> = splitter.split(&edited).iter().map(|r| r.end()).collect();

        // Boundaries far from the edit are shared.
        let tail = |ends: &[u64]| -> Vec<u64> {
            ends.iter().copied().filter(|&e| e > 20_000).collect()
        };
        assert_eq!(tail(&original), tail(&changed));
    }

    #[test]
    fn test_invalid_config() {
        let config = ChunkConfig::default().with_min_size(0);
        assert!(Splitter::new(config).is_err());
    }

    #[test]
    fn test_range_helpers() {
        let range = ChunkRange::new(100, 5);
        assert_eq!(range.end(), 105);
        assert_eq!(range.range(), 100..105);
        assert_eq!(range.to_string(), "[100, 105)");
    }
}
