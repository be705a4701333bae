//! Cryptographic primitives for the merit backend.
//!
//! This module provides the hashing and signature primitives behind the two
//! redemption paths:
//!
//! - **SHA-256 hashing**: Merkle leaves/nodes and authorization signing
//!   digests. SHA-256 rather than an internal-only hash because both digests
//!   are recomputed by an external verifier.
//! - **Ed25519 signatures**: the off-chain authorization signer holds exactly
//!   one signing key. Ed25519 signatures are deterministic, so re-signing an
//!   identical payload yields identical bytes — idempotent re-issuance needs
//!   no signature cache.

pub mod hash;
pub mod sign;

pub use hash::{DIGEST_SIZE, Digest, DigestError, decode_digest, sha256, sha256_parts};
pub use sign::{
    PUBLIC_KEY_SIZE, SEED_SIZE, SIGNATURE_SIZE, SignerError, TicketSigner, verify_signature,
};
