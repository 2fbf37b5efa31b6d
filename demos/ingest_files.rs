//! Ingest files through a processor pool.
//!
//! Each file given on the command line is chunked, compressed and hashed
//! into a staging directory. The demo prints one line per piece and then
//! deletes the staged artifacts again.
//!
//! Run with:
//!     RUST_LOG=ingestrs=debug cargo run --example ingest_files -- <FILE>...

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use ingestrs::{ChunkConfig, FileResult, Job, PoolConfig, ProcessorPool};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: ingest_files <FILE>...");
        std::process::exit(2);
    }

    let staging = tempfile::tempdir()?;
    let config = PoolConfig::new(staging.path()).with_chunk_config(ChunkConfig::new(
        256 * 1024,      // min: 256 KiB
        1024 * 1024,     // avg: 1 MiB
        4 * 1024 * 1024, // max: 4 MiB
    )?);

    let pool = ProcessorPool::with_config(config)?;
    println!("Ingesting {} file(s) with {} workers\n", paths.len(), pool.workers());

    let results: Arc<Mutex<Vec<FileResult>>> = Arc::default();
    let sink = Arc::clone(&results);
    pool.on_result(move |result| sink.lock().push(result));

    for path in &paths {
        pool.submit(Job::new(path, true))?;
    }
    pool.shutdown();

    let mut total_pieces = 0;
    for result in results.lock().iter() {
        match result.status() {
            Ok(()) => {
                let mode = if result.is_chunked() { "chunked" } else { "bulk" };
                println!("{} ({mode})", result.local_path().display());
                for piece in result.pieces() {
                    println!("  {:>12} {:>10}  {}", piece.offset(), piece.size(), piece.content_hash());
                    std::fs::remove_file(piece.temporary_path())?;
                }
                total_pieces += result.pieces().len();
            }
            Err(kind) => {
                let detail = result.error().map(ToString::to_string).unwrap_or_default();
                println!("{} failed ({kind}): {detail}", result.local_path().display());
            }
        }
    }

    println!("\nTotal pieces: {total_pieces}");
    Ok(())
}
