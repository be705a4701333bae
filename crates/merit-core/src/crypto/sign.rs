//! Ed25519 signing for claim authorizations.
//!
//! The service holds at most one signing key. Signatures are deterministic
//! per RFC 8032: signing the same message twice yields the same bytes, which
//! is what lets badge issuance re-derive an authorization instead of caching
//! it.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// Size of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of a signing key seed in bytes.
pub const SEED_SIZE: usize = 32;

/// Errors that can occur during signer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The seed string is not a 32-byte hex payload.
    #[error("invalid signing key seed: {0}")]
    InvalidSeed(String),

    /// The public key bytes do not form a valid Ed25519 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// The signature bytes have the wrong length or shape.
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    /// The signature does not verify against the message and key.
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Single-key Ed25519 signer for authorization payloads.
pub struct TicketSigner {
    signing_key: SigningKey,
}

impl TicketSigner {
    /// Generates a fresh signing key from the OS entropy source.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Loads a signer from a hex-encoded 32-byte seed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSeed` if the payload is not 32 bytes of hex.
    pub fn from_seed_hex(seed: &str) -> Result<Self, SignerError> {
        let payload = seed.strip_prefix("0x").unwrap_or(seed);
        let bytes =
            hex::decode(payload).map_err(|err| SignerError::InvalidSeed(err.to_string()))?;
        let raw: [u8; SEED_SIZE] = bytes.try_into().map_err(|rejected: Vec<u8>| {
            SignerError::InvalidSeed(format!(
                "expected {SEED_SIZE} bytes, got {}",
                rejected.len()
            ))
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&raw),
        })
    }

    /// Returns the hex-encoded seed for storage.
    ///
    /// Handle with care: the seed is the private key.
    #[must_use]
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Signs a message, returning the raw signature bytes.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Returns the verifying key bytes for export to the external verifier.
    #[must_use]
    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Returns the hex-encoded verifying key.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

impl std::fmt::Debug for TicketSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the seed through Debug output.
        f.debug_struct("TicketSigner")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

/// Verifies a signature against a message and public key.
///
/// # Errors
///
/// Returns an error if the key or signature bytes are malformed, or if the
/// signature does not verify.
pub fn verify_signature(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignerError> {
    let key_bytes: [u8; PUBLIC_KEY_SIZE] =
        public_key
            .try_into()
            .map_err(|_| SignerError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_SIZE} bytes, got {}",
                public_key.len()
            )))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|err| SignerError::InvalidPublicKey(err.to_string()))?;
    let signature = Signature::from_slice(signature)
        .map_err(|err| SignerError::InvalidSignature(err.to_string()))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignerError::VerificationFailed)
}
