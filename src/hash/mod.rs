//! Content hashing for staged pieces.
//!
//! - [`HashAlgorithm`] - Which digest to compute (BLAKE3, or SHA-256 with the
//!   `sha256` feature)
//! - [`ContentHash`] - 32-byte digest tagged with its algorithm
//! - [`Hasher`] - Incremental hashing state
//!
//! Hashing is a pure function of the input bytes: no state is shared between
//! calls, so workers hash disjoint data concurrently without coordination.

mod digest;
mod hasher;

pub use digest::{ContentHash, ParseHashError};
pub use hasher::{HashAlgorithm, Hasher};
