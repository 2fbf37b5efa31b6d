//! Hash algorithm selection and incremental hashing.

use std::fmt;
use std::str::FromStr;

use super::ContentHash;

/// A content hash algorithm.
///
/// Every supported algorithm produces a 32-byte digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashAlgorithm {
    /// BLAKE3 (default).
    #[default]
    Blake3,
    /// SHA-256 (requires `sha256` feature).
    #[cfg(feature = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// Returns the short name of the algorithm.
    pub const fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            #[cfg(feature = "sha256")]
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Returns the suffix appended to the textual form of a digest.
    ///
    /// The default algorithm carries no suffix.
    pub const fn suffix(&self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "",
            #[cfg(feature = "sha256")]
            HashAlgorithm::Sha256 => "-sha256",
        }
    }

    /// Starts an incremental hash.
    pub fn hasher(&self) -> Hasher {
        let state = match self {
            HashAlgorithm::Blake3 => State::Blake3(Box::new(blake3::Hasher::new())),
            #[cfg(feature = "sha256")]
            HashAlgorithm::Sha256 => State::Sha256(<sha2::Sha256 as sha2::Digest>::new()),
        };
        Hasher { state }
    }

    /// Convenience method to hash data in one shot.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        match self {
            HashAlgorithm::Blake3 => ContentHash::new(*self, blake3::hash(data).into()),
            #[cfg(feature = "sha256")]
            HashAlgorithm::Sha256 => {
                let digest: [u8; 32] = <sha2::Sha256 as sha2::Digest>::digest(data).into();
                ContentHash::new(*self, digest)
            }
        }
    }

    pub(crate) fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "" => Some(HashAlgorithm::Blake3),
            #[cfg(feature = "sha256")]
            "-sha256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(HashAlgorithm::Blake3),
            #[cfg(feature = "sha256")]
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            other => Err(format!("unsupported hash algorithm: {other}")),
        }
    }
}

enum State {
    Blake3(Box<blake3::Hasher>),
    #[cfg(feature = "sha256")]
    Sha256(sha2::Sha256),
}

/// An incremental hasher for one piece.
pub struct Hasher {
    state: State,
}

impl Hasher {
    /// Updates the hasher with more data.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Blake3(state) => {
                state.update(data);
            }
            #[cfg(feature = "sha256")]
            State::Sha256(state) => sha2::Digest::update(state, data),
        }
    }

    /// Returns the algorithm this hasher computes.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self.state {
            State::Blake3(_) => HashAlgorithm::Blake3,
            #[cfg(feature = "sha256")]
            State::Sha256(_) => HashAlgorithm::Sha256,
        }
    }

    /// Finalizes and returns the hash.
    pub fn finalize(self) -> ContentHash {
        let algorithm = self.algorithm();
        match self.state {
            State::Blake3(state) => ContentHash::new(algorithm, state.finalize().into()),
            #[cfg(feature = "sha256")]
            State::Sha256(state) => {
                let digest: [u8; 32] = sha2::Digest::finalize(state).into();
                ContentHash::new(algorithm, digest)
            }
        }
    }
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hasher")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash() {
        let hash = HashAlgorithm::Blake3.hash(b"hello world");
        assert_eq!(hash.as_bytes().len(), 32);
        assert_eq!(hash.algorithm(), HashAlgorithm::Blake3);

        // Hash should be deterministic
        let hash2 = HashAlgorithm::Blake3.hash(b"hello world");
        assert_eq!(hash, hash2);

        // Different data should give different hash
        let hash3 = HashAlgorithm::Blake3.hash(b"hello world!");
        assert_ne!(hash, hash3);
    }

    #[test]
    fn test_matches_blake3_reference() {
        let hash = HashAlgorithm::Blake3.hash(b"abc");
        assert_eq!(hash.as_bytes(), blake3::hash(b"abc").as_bytes());
    }

    #[test]
    fn test_incremental_hashing() {
        let mut hasher = HashAlgorithm::Blake3.hasher();
        hasher.update(b"hello ");
        hasher.update(b"world");
        let hash = hasher.finalize();

        let expected = HashAlgorithm::Blake3.hash(b"hello world");
        assert_eq!(hash, expected);
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("blake3".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Blake3));
        assert_eq!("BLAKE3".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Blake3));
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[cfg(feature = "sha256")]
    #[test]
    fn test_sha256() {
        let hash = HashAlgorithm::Sha256.hash(b"abc");
        assert_eq!(
            hash.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let mut hasher = HashAlgorithm::Sha256.hasher();
        hasher.update(b"a");
        hasher.update(b"bc");
        assert_eq!(hasher.finalize(), hash);
        assert_eq!("sha256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
    }
}
