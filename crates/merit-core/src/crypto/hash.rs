//! SHA-256 digest helpers.

use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Type alias for a 32-byte digest.
pub type Digest = [u8; DIGEST_SIZE];

/// Errors that can occur when decoding a hex-encoded digest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The hex payload does not decode to exactly [`DIGEST_SIZE`] bytes.
    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// The required byte length.
        expected: usize,
        /// The length that was actually decoded.
        actual: usize,
    },

    /// The string contains characters outside the hex alphabet.
    #[error("invalid digest encoding: {0}")]
    InvalidHex(String),
}

/// Hashes a single byte slice.
#[must_use]
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hashes the concatenation of several byte slices without allocating the
/// joined buffer.
#[must_use]
pub fn sha256_parts(parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Decodes a hex-encoded digest, with or without a `0x` prefix.
///
/// # Errors
///
/// Returns an error if the payload is not valid hex or has the wrong length.
pub fn decode_digest(input: &str) -> Result<Digest, DigestError> {
    let payload = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(payload).map_err(|err| DigestError::InvalidHex(err.to_string()))?;
    bytes
        .try_into()
        .map_err(|rejected: Vec<u8>| DigestError::InvalidLength {
            expected: DIGEST_SIZE,
            actual: rejected.len(),
        })
}

/// Serde adapter for digest fields rendered as hex strings.
pub mod serde_hex_digest {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Digest, decode_digest};

    /// Serializes a digest as a lowercase hex string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(digest: &Digest, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(digest))
    }

    /// Deserializes a digest from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a 32-byte hex payload.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Digest, D::Error> {
        let raw = String::deserialize(deserializer)?;
        decode_digest(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for byte-vector fields rendered as hex strings.
pub mod serde_hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as a lowercase hex string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserializes bytes from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(raw.strip_prefix("0x").unwrap_or(&raw)).map_err(D::Error::custom)
    }
}
