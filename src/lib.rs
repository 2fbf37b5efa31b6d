//! ingestrs
//!
//! Concurrent file ingestion for content-addressed storage.
//!
//! `ingestrs` turns local files into staged, content-addressed pieces:
//!
//! - memory-maps each file read-only
//! - splits large files with FastCDC so that local edits shift few boundaries
//! - compresses every piece with zstd into a uniquely named temporary file
//! - hashes the stored bytes (BLAKE3, or SHA-256 with the `sha256` feature)
//!
//! The crate intentionally:
//! - does NOT promote pieces into permanent storage
//! - does NOT delete the temporary files it hands out
//! - does NOT retry failed jobs
//! - uses `unsafe` only for the single `Mmap::map` call that maps an input
//!   file; everything else is checked by `#![deny(unsafe_code)]`
//!
//! The caller moves each piece into its store by the recorded hash and path.
//!
//! # Single file
//!
//! ```no_run
//! use std::sync::Arc;
//! use ingestrs::{FileProcessor, Job, PoolConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = FileProcessor::new(Arc::new(PoolConfig::new("/var/tmp/ingest")))?;
//!
//!     let result = processor.process(&Job::new("data.bin", true));
//!     for piece in result.pieces() {
//!         println!("{} -> {}", piece.content_hash(), piece.temporary_path().display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Pool
//!
//! ```no_run
//! use ingestrs::{Job, PoolConfig, ProcessorPool};
//!
//! fn main() -> Result<(), ingestrs::PoolError> {
//!     let pool = ProcessorPool::with_config(PoolConfig::new("/var/tmp/ingest").with_concurrency(4))?;
//!     pool.on_result(|result| match result.status() {
//!         Ok(()) => println!("{}: {} pieces", result.local_path().display(), result.pieces().len()),
//!         Err(kind) => eprintln!("{}: {kind} error", result.local_path().display()),
//!     });
//!
//!     for path in ["a.bin", "b.bin", "c.bin"] {
//!         pool.submit(Job::new(path, true)).ok();
//!     }
//!     pool.shutdown();
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod chunker;
mod config;
mod error;
mod hash;
mod mmap;
mod piece;
mod pool;
mod processor;
mod store;

mod cdc;

//
// Public surface
//

pub use cdc::FastCdc;
pub use chunker::{ChunkRange, Ranges, Splitter};
pub use config::{
    ChunkConfig, DEFAULT_AVG_CHUNK_SIZE, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MAX_CHUNK_SIZE,
    DEFAULT_MIN_CHUNK_SIZE, DEFAULT_NORMALIZATION_LEVEL, DEFAULT_TEMP_PREFIX, PoolConfig,
};
pub use error::{ConfigError, ErrorKind, PoolError, ProcessError};
pub use hash::{ContentHash, HashAlgorithm, Hasher, ParseHashError};
pub use mmap::MappedFile;
pub use piece::{FileResult, Piece, Pieces};
pub use pool::{ProcessorPool, SubmitError, Worker, WorkerPool};
pub use processor::{FileProcessor, Job};
pub use store::{TempArtifact, TempFile, TempStore};
