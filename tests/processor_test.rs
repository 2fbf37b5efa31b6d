// Integration tests for the FileProcessor
// Tests cover: range coverage, bulk/chunked decision, determinism, locality, failures

use std::path::Path;
use std::sync::Arc;

use ingestrs::{ChunkConfig, ErrorKind, FileProcessor, HashAlgorithm, Job, PoolConfig};

const MIB: usize = 1024 * 1024;

/// Deterministic pseudo-random bytes (xorshift64).
fn sample(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn small_chunks() -> ChunkConfig {
    ChunkConfig::new(1024, 4096, 16384).unwrap()
}

fn processor(staging: &Path, chunks: ChunkConfig) -> FileProcessor {
    let config = PoolConfig::new(staging)
        .with_chunk_config(chunks)
        .with_concurrency(1);
    FileProcessor::new(Arc::new(config)).unwrap()
}

fn staged_files(staging: &Path) -> usize {
    std::fs::read_dir(staging).unwrap().count()
}

// ============================================================================
// Coverage and Mode Selection
// ============================================================================

#[test]
fn test_pieces_cover_file_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, sample(300_000, 7)).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let result = processor(staging.path(), small_chunks()).process(&Job::new(&input, true));

    assert!(result.is_success(), "{:?}", result.error());
    assert!(result.is_chunked());
    assert!(result.bulk_piece().is_none());

    let mut expected = 0;
    for piece in result.pieces() {
        assert_eq!(piece.offset(), expected, "gap or overlap before {piece}");
        assert!(piece.size() > 0);
        assert!(piece.size() <= 16384);
        assert!(piece.temporary_path().starts_with(staging.path()));
        expected = piece.end();
    }
    assert_eq!(expected, 300_000);
    assert_eq!(staged_files(staging.path()), result.pieces().len());
}

#[test]
fn test_chunking_disallowed_yields_bulk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, sample(100_000, 1)).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let result = processor(staging.path(), small_chunks()).process(&Job::new(&input, false));

    let bulk = result.bulk_piece().expect("bulk piece");
    assert_eq!((bulk.offset(), bulk.size()), (0, 100_000));
    assert!(result.chunk_pieces().is_empty());
    assert!(!result.is_chunked());
}

#[test]
fn test_threshold_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let config = PoolConfig::new(staging.path())
        .with_chunk_config(small_chunks())
        .with_chunking_threshold(50_000);
    let processor = FileProcessor::new(Arc::new(config)).unwrap();

    let at = dir.path().join("at.bin");
    std::fs::write(&at, sample(50_000, 2)).unwrap();
    assert!(processor.process(&Job::new(&at, true)).bulk_piece().is_some());

    let above = dir.path().join("above.bin");
    std::fs::write(&above, sample(50_001, 2)).unwrap();
    assert!(processor.process(&Job::new(&above, true)).is_chunked());
}

#[test]
fn test_single_byte_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("one.bin");
    std::fs::write(&input, b"x").unwrap();

    let staging = tempfile::tempdir().unwrap();
    let result = processor(staging.path(), small_chunks()).process(&Job::new(&input, true));

    let bulk = result.bulk_piece().expect("bulk piece");
    assert_eq!(bulk.size(), 1);
    let stored = std::fs::read(bulk.temporary_path()).unwrap();
    assert_eq!(zstd::decode_all(stored.as_slice()).unwrap(), b"x");
}

// ============================================================================
// Determinism and Locality
// ============================================================================

#[test]
fn test_same_content_same_pieces() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.bin");
    let second = dir.path().join("second.bin");
    let data = sample(200_000, 11);
    std::fs::write(&first, &data).unwrap();
    std::fs::write(&second, &data).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let processor = processor(staging.path(), small_chunks());
    let a = processor.process(&Job::new(&first, true));
    let b = processor.process(&Job::new(&second, true));

    let key = |r: &ingestrs::FileResult| {
        r.pieces()
            .iter()
            .map(|p| (p.range(), *p.content_hash()))
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&a), key(&b));

    // Same hashes, distinct temporary files.
    for (x, y) in a.pieces().iter().zip(b.pieces()) {
        assert_ne!(x.temporary_path(), y.temporary_path());
    }
}

#[test]
fn test_append_keeps_earlier_pieces() {
    let dir = tempfile::tempdir().unwrap();
    let original = sample(250_000, 23);
    let mut appended = original.clone();
    appended.extend(sample(9_000, 99));

    let before = dir.path().join("before.bin");
    let after = dir.path().join("after.bin");
    std::fs::write(&before, &original).unwrap();
    std::fs::write(&after, &appended).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let processor = processor(staging.path(), small_chunks());
    let a = processor.process(&Job::new(&before, true));
    let b = processor.process(&Job::new(&after, true));

    let a_pieces = a.pieces();
    let b_pieces = b.pieces();
    assert!(a_pieces.len() > 2);
    assert!(b_pieces.len() >= a_pieces.len());

    let stable = a_pieces.len() - 1;
    for (x, y) in a_pieces[..stable].iter().zip(&b_pieces[..stable]) {
        assert_eq!(x.range(), y.range());
        assert_eq!(x.content_hash(), y.content_hash());
    }
}

// ============================================================================
// Round Trip
// ============================================================================

#[test]
fn test_ten_mib_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("big.bin");
    let data = sample(10 * MIB, 5);
    std::fs::write(&input, &data).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let chunks = ChunkConfig::new(2 * MIB, 4 * MIB, 8 * MIB).unwrap();
    let result = processor(staging.path(), chunks).process(&Job::new(&input, true));

    let pieces = result.pieces();
    assert!((2..=5).contains(&pieces.len()), "got {} pieces", pieces.len());

    let mut rebuilt = Vec::with_capacity(data.len());
    for (i, piece) in pieces.iter().enumerate() {
        let size = piece.size() as usize;
        assert!(size <= 8 * MIB);
        if i + 1 < pieces.len() {
            assert!(size >= 2 * MIB);
        }

        let stored = std::fs::read(piece.temporary_path()).unwrap();
        assert_eq!(*piece.content_hash(), HashAlgorithm::Blake3.hash(&stored));

        let plain = zstd::decode_all(stored.as_slice()).unwrap();
        assert_eq!(plain.len(), size);
        rebuilt.extend(plain);
    }
    assert_eq!(rebuilt, data);
}

#[test]
fn test_compressible_input_shrinks() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("zeros.bin");
    std::fs::write(&input, vec![0u8; 64 * 1024]).unwrap();

    let staging = tempfile::tempdir().unwrap();
    let result = processor(staging.path(), small_chunks()).process(&Job::new(&input, false));

    let bulk = result.bulk_piece().unwrap();
    let stored_len = std::fs::metadata(bulk.temporary_path()).unwrap().len();
    assert!(stored_len < 1024, "stored {stored_len} bytes");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_empty_file_fails_with_io() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.bin");
    std::fs::write(&input, b"").unwrap();

    let staging = tempfile::tempdir().unwrap();
    let result = processor(staging.path(), small_chunks()).process(&Job::new(&input, true));

    assert_eq!(result.status(), Err(ErrorKind::IoError));
    assert!(result.pieces().is_empty());
    assert!(result.bulk_piece().is_none());
    assert_eq!(staged_files(staging.path()), 0);
}

#[test]
fn test_missing_file_fails_with_io() {
    let staging = tempfile::tempdir().unwrap();
    let missing = staging.path().join("does-not-exist");
    let result = processor(staging.path(), small_chunks()).process(&Job::new(&missing, true));

    assert_eq!(result.status(), Err(ErrorKind::IoError));
    assert_eq!(result.local_path(), missing.as_path());
    assert!(result.error().unwrap().to_string().contains("does-not-exist"));
}

#[test]
fn test_missing_staging_dir_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.bin");
    std::fs::write(&input, sample(100_000, 3)).unwrap();

    let result =
        processor(&dir.path().join("gone"), small_chunks()).process(&Job::new(&input, true));

    assert_eq!(result.status(), Err(ErrorKind::IoError));
    assert_eq!(staged_files(dir.path()), 1);
}

#[cfg(feature = "sha256")]
mod sha256 {
    use super::*;

    #[test]
    fn test_sha256_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        std::fs::write(&input, sample(20_000, 4)).unwrap();

        let staging = tempfile::tempdir().unwrap();
        let config = PoolConfig::new(staging.path())
            .with_chunk_config(small_chunks())
            .with_hash_algorithm(HashAlgorithm::Sha256);
        let processor = FileProcessor::new(Arc::new(config)).unwrap();
        let result = processor.process(&Job::new(&input, true));

        for piece in result.pieces() {
            let stored = std::fs::read(piece.temporary_path()).unwrap();
            assert_eq!(*piece.content_hash(), HashAlgorithm::Sha256.hash(&stored));
            assert!(piece.content_hash().to_string().ends_with("-sha256"));
        }
    }
}
