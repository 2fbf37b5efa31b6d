//! Per-file processing: map, split, compress, hash, stage.
//!
//! [`FileProcessor::process`] turns one [`Job`] into one [`FileResult`]:
//!
//! 1. Map the file read-only; missing or empty files fail with an I/O error
//! 2. Chunk only if the job, the pool and the file size all allow it
//! 3. For every range, stream the bytes through zstd into a temporary file
//!    while hashing the compressed output
//! 4. Publish the artifacts in ascending offset order, or none of them
//!
//! All failures stay inside the returned result.

use std::any::Any;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, debug_span, trace, warn};

use crate::chunker::{ChunkRange, Splitter};
use crate::config::PoolConfig;
use crate::error::{ConfigError, ProcessError};
use crate::hash::{ContentHash, Hasher};
use crate::mmap::MappedFile;
use crate::piece::{FileResult, Pieces, StagedPiece};
use crate::pool::{Worker, panic_message};
use crate::store::{TempFile, TempStore};

/// A request to ingest one local file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    local_path: PathBuf,
    allow_chunking: bool,
}

impl Job {
    /// Creates a job for `local_path`.
    ///
    /// `allow_chunking` is still subject to the pool-wide chunking flag and
    /// the size threshold.
    pub fn new(local_path: impl Into<PathBuf>, allow_chunking: bool) -> Self {
        Self {
            local_path: local_path.into(),
            allow_chunking,
        }
    }

    /// Returns the path of the file to ingest.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Returns whether this job may be chunked.
    pub fn allow_chunking(&self) -> bool {
        self.allow_chunking
    }
}

/// Processes files into staged pieces.
///
/// A processor is cheap to clone and keeps nothing from one job to the
/// next, so one instance may serve many jobs, sequentially or from several
/// threads.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    config: Arc<PoolConfig>,
    splitter: Splitter,
    store: TempStore,
    /// Path of the job inside [`Worker::execute`], for panic reports.
    in_flight: Option<PathBuf>,
}

impl FileProcessor {
    /// Creates a processor sharing `config`.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is unusable.
    pub fn new(config: Arc<PoolConfig>) -> Result<Self, ConfigError> {
        config.validate()?;

        let splitter = Splitter::new(*config.chunk_config())?;
        let store =
            TempStore::new(config.temporary_base_path()).with_prefix(config.temp_prefix());

        Ok(Self {
            config,
            splitter,
            store,
            in_flight: None,
        })
    }

    /// Returns the shared configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Processes one job to completion.
    pub fn process(&self, job: &Job) -> FileResult {
        let span = debug_span!("process", path = %job.local_path().display());
        let _enter = span.enter();
        debug!(allow_chunking = job.allow_chunking(), "job start");

        let outcome = self.run(job);
        match &outcome {
            Ok(pieces) => debug!(pieces = pieces.len(), chunked = pieces.is_chunked(), "job done"),
            Err(e) => warn!(kind = %e.kind(), error = %e, "job failed"),
        }

        FileResult::new(job.local_path().to_path_buf(), outcome)
    }

    fn run(&self, job: &Job) -> Result<Pieces, ProcessError> {
        let file = MappedFile::open(job.local_path())?;

        let ranges = if self.should_chunk(job, file.len()) {
            let ranges = self.splitter.split(&file);
            debug!(size = file.len(), ranges = ranges.len(), "chunking");
            ranges
        } else {
            debug!(size = file.len(), "bulk");
            vec![ChunkRange::new(0, file.len())]
        };

        let staged = stage_all(ranges, |range| self.stage(&file, range))?;
        let pieces = StagedPiece::publish_all(staged)?;
        Ok(Pieces::from_vec(pieces))
    }

    fn should_chunk(&self, job: &Job, file_size: u64) -> bool {
        job.allow_chunking()
            && self.config.chunking_enabled()
            && file_size > self.config.chunking_threshold()
    }

    fn stage(&self, file: &MappedFile, range: ChunkRange) -> Result<StagedPiece, ProcessError> {
        let data = file.slice(range).ok_or_else(|| {
            ProcessError::io(
                file.path(),
                io::Error::new(io::ErrorKind::InvalidInput, format!("range {range} outside file")),
            )
        })?;

        let temp = self
            .store
            .create_temp()
            .map_err(|e| ProcessError::io(self.store.base_path(), e))?;
        let temp_path = temp.path().to_path_buf();

        let mut sink = HashingWriter::new(temp, self.config.hash_algorithm().hasher());
        if let Err(e) = compress_into(data, self.config.compression_level(), &mut sink) {
            return Err(if sink.failed {
                ProcessError::io(temp_path, e)
            } else {
                ProcessError::Compression(e)
            });
        }

        let (temp, content_hash) = sink.into_parts();
        let artifact = temp
            .finalize()
            .map_err(|e| ProcessError::io(&temp_path, e))?;

        trace!(offset = range.offset, size = range.size, hash = %content_hash, "piece staged");

        Ok(StagedPiece {
            range,
            content_hash,
            artifact,
        })
    }
}

impl Worker for FileProcessor {
    type Job = Job;
    type Output = FileResult;

    fn execute(&mut self, job: Job) -> FileResult {
        self.in_flight = Some(job.local_path().to_path_buf());
        let result = self.process(&job);
        self.in_flight = None;
        result
    }

    fn on_panic(&mut self, payload: &(dyn Any + Send)) -> Option<FileResult> {
        let local_path = self.in_flight.take()?;
        let error = ProcessError::Panicked {
            message: panic_message(payload),
        };
        Some(FileResult::new(local_path, Err(error)))
    }
}

/// Stages every range, in offset order, or none of them.
///
/// On the first failure the pieces staged so far are dropped, which deletes
/// their files before the error is returned.
fn stage_all<F>(ranges: Vec<ChunkRange>, mut stage: F) -> Result<Vec<StagedPiece>, ProcessError>
where
    F: FnMut(ChunkRange) -> Result<StagedPiece, ProcessError>,
{
    let mut staged = Vec::with_capacity(ranges.len());
    for range in ranges {
        match stage(range) {
            Ok(piece) => staged.push(piece),
            Err(e) => {
                debug!(discarded = staged.len(), "discarding staged pieces");
                return Err(e);
            }
        }
    }
    staged.sort_by_key(|piece| piece.range.offset);
    Ok(staged)
}

fn compress_into<W: Write>(data: &[u8], level: i32, sink: W) -> io::Result<()> {
    let mut encoder = zstd::stream::Encoder::new(sink, level)?;
    encoder.include_checksum(false)?;
    encoder.write_all(data)?;
    encoder.finish()?;
    Ok(())
}

/// Writes through to a temporary file and hashes everything written.
///
/// Remembers whether the file itself failed, so a failed write can be told
/// apart from a compressor failure.
struct HashingWriter {
    file: TempFile,
    hasher: Hasher,
    failed: bool,
}

impl HashingWriter {
    fn new(file: TempFile, hasher: Hasher) -> Self {
        Self {
            file,
            hasher,
            failed: false,
        }
    }

    fn into_parts(self) -> (TempFile, ContentHash) {
        (self.file, self.hasher.finalize())
    }
}

impl Write for HashingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.write(buf) {
            Ok(n) => {
                self.hasher.update(&buf[..n]);
                Ok(n)
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::Interrupted {
                    self.failed = true;
                }
                Err(e)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush().inspect_err(|_| self.failed = true)
    }
}
