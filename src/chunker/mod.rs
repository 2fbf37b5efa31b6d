//! Splitting mapped input into content-defined ranges.
//!
//! - [`Splitter`] - Turns a byte slice into ordered [`ChunkRange`]s
//! - [`Ranges`] - Lazy iterator behind [`Splitter::split`]

mod splitter;

pub use splitter::{ChunkRange, Ranges, Splitter};
