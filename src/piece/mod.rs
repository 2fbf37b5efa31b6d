//! Pieces and per-file results.
//!
//! A piece moves through three types, and only the last one is public:
//!
//! - [`ChunkRange`] - planned byte range, nothing produced yet
//! - `StagedPiece` - compressed, hashed, written to a temporary file that
//!   is still deleted on drop
//! - [`Piece`] - published: hash and temporary path are both set and the
//!   file belongs to the caller
//!
//! The caller therefore never sees a half-populated piece.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkRange;
use crate::error::{ErrorKind, ProcessError};
use crate::hash::ContentHash;
use crate::store::TempArtifact;

/// A finished piece of an ingested file.
///
/// # Example
///
/// ```no_run
/// # fn show(result: &ingestrs::FileResult) {
/// for piece in result.pieces() {
///     println!("{} {} -> {}", piece.range(), piece.content_hash(), piece.temporary_path().display());
/// }
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    content_hash: ContentHash,
    range: ChunkRange,
    temporary_path: PathBuf,
}

impl Piece {
    /// Returns the content hash of the stored (compressed) bytes.
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Returns the offset of the piece in the source file.
    pub fn offset(&self) -> u64 {
        self.range.offset
    }

    /// Returns the size of the piece in the source file.
    pub fn size(&self) -> u64 {
        self.range.size
    }

    /// Returns the end offset (exclusive).
    pub fn end(&self) -> u64 {
        self.range.end()
    }

    /// Returns the source range of the piece.
    pub fn range(&self) -> ChunkRange {
        self.range
    }

    /// Returns the path of the temporary artifact holding the compressed bytes.
    pub fn temporary_path(&self) -> &Path {
        &self.temporary_path
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Piece({} bytes @ {}, hash={})",
            self.range.size, self.range.offset, self.content_hash
        )
    }
}

/// A piece whose artifact is written but not yet handed out.
#[derive(Debug)]
pub(crate) struct StagedPiece {
    pub(crate) range: ChunkRange,
    pub(crate) content_hash: ContentHash,
    pub(crate) artifact: TempArtifact,
}

impl StagedPiece {
    /// Publishes every piece, or none.
    ///
    /// If keeping one artifact fails, the ones already kept are deleted
    /// again and the remaining ones are dropped (and thereby deleted).
    pub(crate) fn publish_all(staged: Vec<StagedPiece>) -> Result<Vec<Piece>, ProcessError> {
        let mut published: Vec<Piece> = Vec::with_capacity(staged.len());

        for piece in staged {
            let artifact_path = piece.artifact.path().to_path_buf();
            match piece.artifact.persist() {
                Ok(temporary_path) => published.push(Piece {
                    content_hash: piece.content_hash,
                    range: piece.range,
                    temporary_path,
                }),
                Err(e) => {
                    for kept in &published {
                        if let Err(remove_err) = std::fs::remove_file(&kept.temporary_path) {
                            tracing::warn!(
                                path = %kept.temporary_path.display(),
                                error = %remove_err,
                                "failed to remove temporary artifact"
                            );
                        }
                    }
                    return Err(ProcessError::io(artifact_path, e));
                }
            }
        }

        Ok(published)
    }
}

/// The pieces produced from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pieces {
    /// The whole file as one piece.
    Bulk(Piece),
    /// Two or more content-defined chunks in ascending offset order.
    Chunked(Vec<Piece>),
}

impl Pieces {
    /// Wraps published pieces, collapsing a single piece into [`Pieces::Bulk`].
    pub(crate) fn from_vec(mut pieces: Vec<Piece>) -> Self {
        if pieces.len() == 1 {
            if let Some(piece) = pieces.pop() {
                return Pieces::Bulk(piece);
            }
        }
        Pieces::Chunked(pieces)
    }

    /// Returns every piece in ascending offset order.
    pub fn as_slice(&self) -> &[Piece] {
        match self {
            Pieces::Bulk(piece) => std::slice::from_ref(piece),
            Pieces::Chunked(pieces) => pieces,
        }
    }

    /// Returns the number of pieces.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Always false: a result holds at least one piece.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Returns true if the file was split into more than one piece.
    pub fn is_chunked(&self) -> bool {
        matches!(self, Pieces::Chunked(pieces) if pieces.len() > 1)
    }

    /// Consumes the pieces into a vector.
    pub fn into_vec(self) -> Vec<Piece> {
        match self {
            Pieces::Bulk(piece) => vec![piece],
            Pieces::Chunked(pieces) => pieces,
        }
    }
}

/// The outcome of processing one file.
///
/// Exactly one result is delivered per submitted job. A failed result
/// carries no pieces and leaves no temporary artifacts behind.
#[derive(Debug)]
pub struct FileResult {
    local_path: PathBuf,
    outcome: Result<Pieces, ProcessError>,
}

impl FileResult {
    pub(crate) fn new(local_path: PathBuf, outcome: Result<Pieces, ProcessError>) -> Self {
        Self {
            local_path,
            outcome,
        }
    }

    /// Returns the path of the processed file, as given in the job.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Returns `Ok(())` on success or the error kind of the failure.
    pub fn status(&self) -> Result<(), ErrorKind> {
        match &self.outcome {
            Ok(_) => Ok(()),
            Err(e) => Err(e.kind()),
        }
    }

    /// Returns true if the job succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&ProcessError> {
        self.outcome.as_ref().err()
    }

    /// Returns the full outcome.
    pub fn outcome(&self) -> &Result<Pieces, ProcessError> {
        &self.outcome
    }

    /// Returns the bulk piece if the file was processed as one piece.
    pub fn bulk_piece(&self) -> Option<&Piece> {
        match &self.outcome {
            Ok(Pieces::Bulk(piece)) => Some(piece),
            _ => None,
        }
    }

    /// Returns the chunk pieces, empty unless the file was chunked.
    pub fn chunk_pieces(&self) -> &[Piece] {
        match &self.outcome {
            Ok(Pieces::Chunked(pieces)) => pieces,
            _ => &[],
        }
    }

    /// Returns every piece in ascending offset order, empty on failure.
    pub fn pieces(&self) -> &[Piece] {
        match &self.outcome {
            Ok(pieces) => pieces.as_slice(),
            Err(_) => &[],
        }
    }

    /// Returns true if the file was split into more than one piece.
    pub fn is_chunked(&self) -> bool {
        self.chunk_pieces().len() > 1
    }

    /// Splits the result into its path and outcome.
    pub fn into_parts(self) -> (PathBuf, Result<Pieces, ProcessError>) {
        (self.local_path, self.outcome)
    }
}
