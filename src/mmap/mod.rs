//! Read-only memory mapping of input files.
//!
//! A [`MappedFile`] is owned by the worker processing the job and lives for
//! the duration of that job only. Callers must not modify the file while it
//! is mapped.

use std::fs::File;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::chunker::ChunkRange;
use crate::error::ProcessError;

/// A file mapped read-only into memory.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    map: Mmap,
}

impl MappedFile {
    /// Opens and maps `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Io`] if the file cannot be opened or mapped,
    /// or if it is empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProcessError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ProcessError::io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| ProcessError::io(path, e))?
            .len();

        if len == 0 {
            return Err(ProcessError::io(
                path,
                io::Error::new(io::ErrorKind::UnexpectedEof, "file is empty"),
            ));
        }

        // SAFETY: the map is read-only and the caller guarantees the file is
        // not modified while the job runs.
        #[allow(unsafe_code)]
        let map = unsafe { Mmap::map(&file) }.map_err(|e| ProcessError::io(path, e))?;

        #[cfg(unix)]
        if let Err(e) = map.advise(memmap2::Advice::Sequential) {
            tracing::trace!(path = %path.display(), error = %e, "madvise failed");
        }

        Ok(Self {
            path: path.to_path_buf(),
            map,
        })
    }

    /// Returns the path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file size in bytes.
    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    /// Always false: empty files are rejected by [`MappedFile::open`].
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    /// Returns the bytes covered by `range`, or `None` if it lies outside
    /// the file.
    pub fn slice(&self, range: ChunkRange) -> Option<&[u8]> {
        let start = usize::try_from(range.offset).ok()?;
        let end = usize::try_from(range.end()).ok()?;
        self.map.get(start..end)
    }
}

impl Deref for MappedFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.map
    }
}

impl AsRef<[u8]> for MappedFile {
    fn as_ref(&self) -> &[u8] {
        &self.map
    }
}
