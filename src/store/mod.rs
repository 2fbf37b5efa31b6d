//! Temporary artifact staging.
//!
//! Compressed pieces are written before their hash is known, so files get
//! unique random names under the base path instead of content names:
//!
//! 1. [`TempStore::create_temp`] opens a fresh file
//! 2. [`TempFile`] is written through [`std::io::Write`]
//! 3. [`TempFile::finalize`] flushes and closes it into a [`TempArtifact`]
//! 4. [`TempArtifact::persist`] releases the file to the caller
//!
//! Until step 4 the file is deleted whenever its handle is dropped, which is
//! how a failing job cleans up after itself.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};

use crate::config::DEFAULT_TEMP_PREFIX;

/// Write buffer size for temporary files.
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Allocates temporary files under a base directory.
#[derive(Debug, Clone)]
pub struct TempStore {
    base_path: PathBuf,
    prefix: String,
}

impl TempStore {
    /// Creates a store writing into `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            prefix: DEFAULT_TEMP_PREFIX.to_owned(),
        }
    }

    /// Sets the file name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the base directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Creates a fresh, uniquely named writable file.
    ///
    /// Names are random, so concurrent callers never collide.
    pub fn create_temp(&self) -> io::Result<TempFile> {
        let file = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempfile_in(&self.base_path)?;

        Ok(TempFile {
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, file),
        })
    }
}

/// A temporary file open for writing.
///
/// Dropping it deletes the file.
#[derive(Debug)]
pub struct TempFile {
    writer: BufWriter<NamedTempFile>,
}

impl TempFile {
    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Flushes and closes the file.
    pub fn finalize(self) -> io::Result<TempArtifact> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        Ok(TempArtifact {
            path: file.into_temp_path(),
        })
    }
}

impl Write for TempFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A fully written and closed temporary file.
///
/// Dropping it deletes the file; [`TempArtifact::persist`] keeps it.
#[derive(Debug)]
pub struct TempArtifact {
    path: TempPath,
}

impl TempArtifact {
    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the file on disk and returns its path.
    ///
    /// From here on the caller owns the file and is responsible for
    /// deleting it.
    pub fn persist(self) -> io::Result<PathBuf> {
        self.path.keep().map_err(io::Error::from)
    }
}
