//! Content-Defined Chunking (CDC) implementations.
//!
//! This module contains the rolling hash that identifies chunk boundaries
//! based on content patterns rather than fixed sizes.
//!
//! - [`FastCdc`] - FastCDC rolling hash implementation

mod fastcdc;

pub use fastcdc::FastCdc;
pub(crate) use fastcdc::MAX_MASK_BITS;
