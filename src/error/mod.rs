//! Error types for ingestrs.
//!
//! Three layers, one enum each:
//!
//! - [`ConfigError`] - rejected configuration values
//! - [`ProcessError`] - failure of a single job, reported in its result
//! - [`PoolError`] - failure to build a worker pool

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Invalid configuration parameter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Chunk size parameters are inconsistent.
    #[error("invalid chunk sizes: {message}")]
    ChunkSizes {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// A pool parameter is out of range.
    #[error("invalid pool config: {message}")]
    Pool {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// Compression level outside what zstd accepts.
    #[error("compression level {level} out of range {min}..={max}")]
    CompressionLevel {
        /// The rejected level.
        level: i32,
        /// Smallest accepted level.
        min: i32,
        /// Largest accepted level.
        max: i32,
    },
}

/// Status code of a processed job.
///
/// This is the coarse classification a caller branches on; the full
/// [`ProcessError`] carries the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File open, map, read or temporary write failure.
    IoError,
    /// The compressor rejected the input or failed to finish.
    CompressionError,
    /// The digest could not be produced.
    HashingError,
    /// The chunk size configuration is unusable.
    ChunkingPolicyError,
    /// Processing panicked; the job produced no pieces.
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::IoError => "io",
            ErrorKind::CompressionError => "compression",
            ErrorKind::HashingError => "hashing",
            ErrorKind::ChunkingPolicyError => "chunking policy",
            ErrorKind::InternalError => "internal",
        };
        f.write_str(name)
    }
}

/// Errors that fail a single job.
///
/// These never escape the worker that produced them; they are delivered as
/// the status of the job's [`FileResult`](crate::FileResult).
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// An I/O error on the input file or a temporary artifact.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File the operation was acting on.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The compressor failed.
    #[error("compression error: {0}")]
    Compression(#[source] io::Error),

    /// The digest could not be produced.
    #[error("hashing error: {0}")]
    Hashing(String),

    /// The chunk size configuration is unusable.
    #[error(transparent)]
    ChunkingPolicy(#[from] ConfigError),

    /// Processing panicked.
    #[error("processing panicked: {message}")]
    Panicked {
        /// The panic message, if it was a string.
        message: String,
    },
}

impl ProcessError {
    /// Wraps an I/O error together with the path it concerns.
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProcessError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the status code for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::Io { .. } => ErrorKind::IoError,
            ProcessError::Compression(_) => ErrorKind::CompressionError,
            ProcessError::Hashing(_) => ErrorKind::HashingError,
            ProcessError::ChunkingPolicy(_) => ErrorKind::ChunkingPolicyError,
            ProcessError::Panicked { .. } => ErrorKind::InternalError,
        }
    }
}

/// Errors raised while constructing a worker pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool or processor configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The temporary base path is unusable.
    #[error("temporary base path {} unusable: {source}", path.display())]
    TemporaryPath {
        /// The configured base path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A pool thread could not be started.
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}
