//! Configuration for chunking and ingestion.
//!
//! - [`ChunkConfig`] - Chunk size boundaries and normalization
//! - [`PoolConfig`] - Everything a worker pool is built from; shared
//!   read-only by all workers once the pool exists
//!
//! # Example
//!
//! ```
//! use ingestrs::{ChunkConfig, PoolConfig};
//!
//! let chunks = ChunkConfig::new(2 << 20, 4 << 20, 8 << 20)?;
//! let config = PoolConfig::new("/var/spool/ingest")
//!     .with_chunk_config(chunks)
//!     .with_concurrency(4);
//! config.validate()?;
//! # Ok::<(), ingestrs::ConfigError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::cdc::MAX_MASK_BITS;
use crate::error::ConfigError;
use crate::hash::HashAlgorithm;

/// Default minimum chunk size (4 MiB).
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Default average chunk size (8 MiB).
pub const DEFAULT_AVG_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Default maximum chunk size (16 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default normalization level (masks differ by ±2 bits).
pub const DEFAULT_NORMALIZATION_LEVEL: u8 = 2;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default file name prefix for temporary artifacts.
pub const DEFAULT_TEMP_PREFIX: &str = "chunk.";

/// Queue slots per worker when no explicit capacity is set.
const QUEUE_SLOTS_PER_WORKER: usize = 4;

/// Configuration for content-defined chunking.
///
/// Size constraints: `min_size <= avg_size <= max_size`, all powers of 2,
/// `avg_size` between 2 bytes and 1 GiB.
///
/// Normalization level controls chunk size distribution:
/// - Level 0: Single mask
/// - Level 1: Masks differ by ±1 bit
/// - Level N: Masks differ by ±N bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkConfig {
    min_size: usize,
    avg_size: usize,
    max_size: usize,
    normalization_level: u8,
}

impl ChunkConfig {
    /// Creates a new configuration.
    ///
    /// The normalization level defaults to [`DEFAULT_NORMALIZATION_LEVEL`],
    /// lowered if the average size is too small to carry it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ChunkSizes`] if sizes are zero, not powers of
    /// 2, out of order, or the average is below 2 bytes or above 1 GiB.
    pub fn new(min_size: usize, avg_size: usize, max_size: usize) -> Result<Self, ConfigError> {
        check_sizes(min_size, avg_size, max_size)?;

        let avg_bits = avg_size.trailing_zeros() as u8;
        let headroom = (MAX_MASK_BITS as u8).saturating_sub(avg_bits);
        let effective_level = DEFAULT_NORMALIZATION_LEVEL
            .min(avg_bits.saturating_sub(1))
            .min(headroom);

        let config = Self {
            min_size,
            avg_size,
            max_size,
            normalization_level: effective_level,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the minimum chunk size.
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Sets the average chunk size.
    pub fn with_avg_size(mut self, size: usize) -> Self {
        self.avg_size = size;
        self
    }

    /// Sets the maximum chunk size.
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the normalization level.
    pub fn with_normalization_level(mut self, level: u8) -> Self {
        self.normalization_level = level;
        self
    }

    /// Returns the minimum chunk size.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Returns the average chunk size.
    pub fn avg_size(&self) -> usize {
        self.avg_size
    }

    /// Returns the maximum chunk size.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the normalization level.
    pub fn normalization_level(&self) -> u8 {
        self.normalization_level
    }

    /// Validates the current configuration.
    ///
    /// Setters do not validate; call this after building.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_sizes(self.min_size, self.avg_size, self.max_size)?;

        let avg_bits = self.avg_size.trailing_zeros();
        let level = u32::from(self.normalization_level);
        if level >= avg_bits || avg_bits + level > MAX_MASK_BITS {
            return Err(ConfigError::ChunkSizes {
                message: "normalization level too large for avg_size",
            });
        }
        Ok(())
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_CHUNK_SIZE,
            avg_size: DEFAULT_AVG_CHUNK_SIZE,
            max_size: DEFAULT_MAX_CHUNK_SIZE,
            normalization_level: DEFAULT_NORMALIZATION_LEVEL,
        }
    }
}

fn check_sizes(min_size: usize, avg_size: usize, max_size: usize) -> Result<(), ConfigError> {
    if min_size == 0 || avg_size == 0 || max_size == 0 {
        return Err(ConfigError::ChunkSizes {
            message: "chunk sizes must be non-zero",
        });
    }

    if min_size > avg_size {
        return Err(ConfigError::ChunkSizes {
            message: "min_size cannot be greater than avg_size",
        });
    }

    if avg_size > max_size {
        return Err(ConfigError::ChunkSizes {
            message: "avg_size cannot be greater than max_size",
        });
    }

    if !min_size.is_power_of_two() || !avg_size.is_power_of_two() || !max_size.is_power_of_two() {
        return Err(ConfigError::ChunkSizes {
            message: "chunk sizes should be powers of 2",
        });
    }

    if avg_size < 2 {
        return Err(ConfigError::ChunkSizes {
            message: "avg_size must be at least 2",
        });
    }

    if avg_size.trailing_zeros() >= MAX_MASK_BITS {
        return Err(ConfigError::ChunkSizes {
            message: "avg_size cannot exceed 1 GiB",
        });
    }

    Ok(())
}

/// Configuration of a file processing pool.
///
/// Fixed at pool construction. Workers only ever read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    temporary_base_path: PathBuf,
    temp_prefix: String,
    chunking_enabled: bool,
    chunk_config: ChunkConfig,
    chunking_threshold: Option<u64>,
    concurrency: usize,
    queue_capacity: Option<usize>,
    hash_algorithm: HashAlgorithm,
    compression_level: i32,
}

impl PoolConfig {
    /// Creates a configuration staging artifacts under `temporary_base_path`.
    ///
    /// Chunking is enabled and concurrency matches the available
    /// parallelism of the machine.
    pub fn new(temporary_base_path: impl Into<PathBuf>) -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            temporary_base_path: temporary_base_path.into(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_owned(),
            chunking_enabled: true,
            chunk_config: ChunkConfig::default(),
            chunking_threshold: None,
            concurrency,
            queue_capacity: None,
            hash_algorithm: HashAlgorithm::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Enables or disables chunking for every job of the pool.
    pub fn with_chunking(mut self, enabled: bool) -> Self {
        self.chunking_enabled = enabled;
        self
    }

    /// Sets the chunk size policy.
    pub fn with_chunk_config(mut self, config: ChunkConfig) -> Self {
        self.chunk_config = config;
        self
    }

    /// Sets the file size a file must exceed to be chunked.
    pub fn with_chunking_threshold(mut self, bytes: u64) -> Self {
        self.chunking_threshold = Some(bytes);
        self
    }

    /// Sets the number of worker threads.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    /// Sets how many jobs may wait in the queue before `submit` blocks.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets the content hash algorithm.
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Sets the zstd compression level.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets the file name prefix of temporary artifacts.
    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    /// Returns the directory temporary artifacts are written to.
    pub fn temporary_base_path(&self) -> &Path {
        &self.temporary_base_path
    }

    /// Returns the file name prefix of temporary artifacts.
    pub fn temp_prefix(&self) -> &str {
        &self.temp_prefix
    }

    /// Returns whether chunking is enabled pool-wide.
    pub fn chunking_enabled(&self) -> bool {
        self.chunking_enabled
    }

    /// Returns the chunk size policy.
    pub fn chunk_config(&self) -> &ChunkConfig {
        &self.chunk_config
    }

    /// Returns the size a file must exceed to be chunked.
    ///
    /// Defaults to the minimum chunk size.
    pub fn chunking_threshold(&self) -> u64 {
        self.chunking_threshold
            .unwrap_or(self.chunk_config.min_size() as u64)
    }

    /// Returns the number of worker threads.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the job queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or(self.concurrency.saturating_mul(QUEUE_SLOTS_PER_WORKER))
    }

    /// Returns the content hash algorithm.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Returns the zstd compression level.
    pub fn compression_level(&self) -> i32 {
        self.compression_level
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk_config.validate()?;

        if self.concurrency == 0 {
            return Err(ConfigError::Pool {
                message: "concurrency must be at least 1",
            });
        }

        if self.queue_capacity() == 0 {
            return Err(ConfigError::Pool {
                message: "queue capacity must be at least 1",
            });
        }

        let levels = zstd::compression_level_range();
        if !levels.contains(&self.compression_level) {
            return Err(ConfigError::CompressionLevel {
                level: self.compression_level,
                min: *levels.start(),
                max: *levels.end(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_config_default() {
        let config = ChunkConfig::default();
        assert_eq!(config.min_size(), 4 << 20);
        assert_eq!(config.avg_size(), 8 << 20);
        assert_eq!(config.max_size(), 16 << 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunk_config_builder() {
        let config = ChunkConfig::default()
            .with_min_size(8192)
            .with_avg_size(32768)
            .with_max_size(131072);
        assert_eq!(config.min_size(), 8192);
        assert_eq!(config.avg_size(), 32768);
        assert_eq!(config.max_size(), 131072);
    }

    #[test]
    fn test_chunk_config_invalid_zero() {
        assert!(ChunkConfig::new(0, 16384, 65536).is_err());
        assert!(ChunkConfig::new(4096, 0, 65536).is_err());
        assert!(ChunkConfig::new(4096, 16384, 0).is_err());
    }

    #[test]
    fn test_chunk_config_invalid_ordering() {
        assert!(ChunkConfig::new(32768, 16384, 65536).is_err());
        assert!(ChunkConfig::new(4096, 65536, 16384).is_err());
    }

    #[test]
    fn test_chunk_config_invalid_non_power_of_two() {
        assert!(ChunkConfig::new(5, 16, 64).is_err());
        assert!(ChunkConfig::new(4, 17, 64).is_err());
        assert!(ChunkConfig::new(4, 16, 65).is_err());
    }

    #[test]
    fn test_chunk_config_avg_too_large() {
        assert!(ChunkConfig::new(1 << 20, 1 << 31, 1 << 32).is_err());
        assert!(ChunkConfig::new(1 << 20, 1 << 30, 1 << 32).is_ok());
    }

    #[test]
    fn test_normalization_clamped_for_small_avg() {
        let config = ChunkConfig::new(1, 2, 4).unwrap();
        assert_eq!(config.normalization_level(), 0);
        assert!(config.validate().is_ok());

        let config = ChunkConfig::new(2 << 20, 4 << 20, 8 << 20).unwrap();
        assert_eq!(config.normalization_level(), DEFAULT_NORMALIZATION_LEVEL);

        // Nothing is left to normalize with a one-byte average.
        assert!(ChunkConfig::new(1, 1, 1).is_err());
        assert!(ChunkConfig::new(1, 1, 4).is_err());

        // Whatever `new` accepts also passes `validate`.
        for (min, avg, max) in [(1, 2, 2), (2, 4, 8), (4, 8, 8), (1 << 10, 1 << 29, 1 << 30)] {
            let config = ChunkConfig::new(min, avg, max).unwrap();
            assert!(config.validate().is_ok(), "{config:?}");
            assert!(crate::Splitter::new(config).is_ok());
        }
    }

    #[test]
    fn test_normalization_validated() {
        let config = ChunkConfig::new(4, 16, 64)
            .unwrap()
            .with_normalization_level(4);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::new("/tmp/ingest").with_concurrency(3);
        assert!(config.chunking_enabled());
        assert_eq!(config.queue_capacity(), 12);
        assert_eq!(config.chunking_threshold(), DEFAULT_MIN_CHUNK_SIZE as u64);
        assert_eq!(config.temp_prefix(), DEFAULT_TEMP_PREFIX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pool_config_invalid() {
        let config = PoolConfig::new("/tmp/ingest").with_concurrency(0);
        assert!(config.validate().is_err());

        let config = PoolConfig::new("/tmp/ingest").with_queue_capacity(0);
        assert!(config.validate().is_err());

        let config = PoolConfig::new("/tmp/ingest").with_compression_level(1000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CompressionLevel { level: 1000, .. })
        ));

        let config =
            PoolConfig::new("/tmp/ingest").with_chunk_config(ChunkConfig::default().with_min_size(0));
        assert!(config.validate().is_err());
    }
}
