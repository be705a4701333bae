//! Core domain logic for the merit loyalty/airdrop backend.
//!
//! This crate holds everything that does not touch storage:
//!
//! - **Addresses**: 20-byte wallet/contract identifiers with hex encoding
//! - **Hashing**: SHA-256 digest helpers shared by the Merkle tree and the
//!   authorization signer
//! - **Merkle distribution trees**: roster commitment plus per-leaf inclusion
//!   proofs, in the exact byte layout the external verifier expects
//! - **Claim authorizations**: domain-separated, bounded-lifetime permission
//!   payloads signed with a single Ed25519 key
//!
//! The service crate (`merit-service`) composes these primitives with a
//! `SQLite`-backed store; nothing in this crate performs I/O.

pub mod address;
pub mod auth;
pub mod crypto;
pub mod merkle;

pub use address::{ADDRESS_SIZE, Address, AddressError};
pub use auth::{
    AuthError, BADGE_CLAIM_VALIDITY_SECS, CHECKIN_MINT_VALIDITY_SECS, ClaimAuthorization,
    ClaimDomain, SignedAuthorization, nonce_for_order,
};
pub use crypto::hash::{DIGEST_SIZE, Digest, DigestError, decode_digest, sha256, sha256_parts};
pub use crypto::sign::{
    PUBLIC_KEY_SIZE, SEED_SIZE, SIGNATURE_SIZE, SignerError, TicketSigner, verify_signature,
};
pub use merkle::{DistributionTree, MerkleError, RosterEntry, leaf_hash, verify_proof};
