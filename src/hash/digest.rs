//! Content hash types.

use std::fmt;
use std::hash::{Hash as StdHash, Hasher as StdHasher};
use std::str::FromStr;

use super::HashAlgorithm;

/// A fixed-size digest of piece content, tagged with its algorithm.
///
/// The textual form is the lowercase hex digest followed by the algorithm
/// suffix (empty for BLAKE3), which is also what [`FromStr`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContentHash {
    algorithm: HashAlgorithm,
    bytes: [u8; 32],
}

impl ContentHash {
    /// The size of the digest in bytes.
    pub const SIZE: usize = 32;

    /// Creates a new content hash from a byte array.
    pub const fn new(algorithm: HashAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Creates a new content hash from a slice.
    ///
    /// Returns `None` if the slice is not exactly 32 bytes.
    pub fn from_slice(algorithm: HashAlgorithm, slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 32] = slice.try_into().ok()?;
        Some(Self { algorithm, bytes })
    }

    /// Returns the algorithm that produced this digest.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Returns the digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Returns the digest as a hex string, without the algorithm suffix.
    pub fn to_hex(&self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut result = String::with_capacity(Self::SIZE * 2);
        for byte in &self.bytes {
            result.push(HEX[(byte >> 4) as usize] as char);
            result.push(HEX[(byte & 0xf) as usize] as char);
        }
        result
    }

    /// Creates a digest from a hex string without suffix.
    ///
    /// Returns `None` if the string is not valid hex or not exactly 64 characters.
    pub fn from_hex(algorithm: HashAlgorithm, hex_str: &str) -> Option<Self> {
        // `from_str_radix` alone would also take a sign character.
        if hex_str.len() != Self::SIZE * 2 || !hex_str.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex_str[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self { algorithm, bytes })
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl StdHash for ContentHash {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        StdHash::hash(&self.algorithm, state);
        state.write(&self.bytes);
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.bytes {
            write!(f, "{:02x}", byte)?;
        }
        f.write_str(self.algorithm.suffix())
    }
}

/// Error returned when parsing a [`ContentHash`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid content hash: {input}")]
pub struct ParseHashError {
    input: String,
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseHashError {
            input: s.to_owned(),
        };

        if s.len() < Self::SIZE * 2 || !s.is_char_boundary(Self::SIZE * 2) {
            return Err(invalid());
        }
        let (hex, suffix) = s.split_at(Self::SIZE * 2);
        let algorithm = HashAlgorithm::from_suffix(suffix).ok_or_else(invalid)?;
        Self::from_hex(algorithm, hex).ok_or_else(invalid)
    }
}
