//! Off-chain claim authorizations.
//!
//! An authorization is a bounded-lifetime permission letting a named
//! recipient redeem a specific asset quantity exactly once. The payload is
//! hashed under a NUL-terminated domain separator before signing, so a badge
//! ticket can never be replayed as a live check-in mint, against a different
//! contract, or on another deployment of this signer.
//!
//! Nonces for badge claims derive from the owning order identifier, which
//! makes re-issuance naturally idempotent: the same order always produces
//! the same nonce, the same digest, and (Ed25519 being deterministic) the
//! same signature.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq as _;
use thiserror::Error;

use crate::address::Address;
use crate::crypto::hash::{Digest, sha256_parts};
use crate::crypto::sign::{SIGNATURE_SIZE, SignerError, TicketSigner, verify_signature};

/// Domain separator for badge claim authorizations.
const BADGE_CLAIM_SEPARATOR: &[u8] = b"merit:badge_claim:v1\0";

/// Domain separator for live check-in mint authorizations.
const CHECKIN_MINT_SEPARATOR: &[u8] = b"merit:checkin_mint:v1\0";

/// Domain separator for order-derived nonces.
const ORDER_NONCE_SEPARATOR: &[u8] = b"merit:order_nonce:v1\0";

/// Validity window for badge claim deadlines: 7 days.
pub const BADGE_CLAIM_VALIDITY_SECS: u64 = 7 * 24 * 60 * 60;

/// Validity window for live check-in mint deadlines: 10 minutes.
pub const CHECKIN_MINT_VALIDITY_SECS: u64 = 10 * 60;

/// Errors that can occur when validating or verifying authorizations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The deadline is not in the future.
    #[error("deadline {deadline} has already passed (now {now})")]
    DeadlineExpired {
        /// The rejected deadline, Unix seconds.
        deadline: u64,
        /// The reference time, Unix seconds.
        now: u64,
    },

    /// The deadline lies beyond the domain's validity window.
    #[error("deadline {deadline} exceeds the {window_secs}s validity window (now {now})")]
    DeadlineBeyondWindow {
        /// The rejected deadline, Unix seconds.
        deadline: u64,
        /// The reference time, Unix seconds.
        now: u64,
        /// The domain's maximum window in seconds.
        window_secs: u64,
    },

    /// Signature bytes or key bytes are malformed, or verification failed.
    #[error(transparent)]
    Signer(#[from] SignerError),
}

/// Claim context an authorization is bound to.
///
/// Each domain carries its own separator and validity window; the separator
/// participates in the signing digest, which is what prevents cross-context
/// replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimDomain {
    /// Badge redemption tied to a completed purchase order.
    BadgeClaim,
    /// Short-lived mint authorized at check-in time.
    CheckinMint,
}

impl ClaimDomain {
    /// Returns the NUL-terminated domain separator.
    #[must_use]
    pub const fn separator(self) -> &'static [u8] {
        match self {
            Self::BadgeClaim => BADGE_CLAIM_SEPARATOR,
            Self::CheckinMint => CHECKIN_MINT_SEPARATOR,
        }
    }

    /// Returns the maximum deadline window for this domain, in seconds.
    #[must_use]
    pub const fn validity_window_secs(self) -> u64 {
        match self {
            Self::BadgeClaim => BADGE_CLAIM_VALIDITY_SECS,
            Self::CheckinMint => CHECKIN_MINT_VALIDITY_SECS,
        }
    }
}

/// Derives the single-use nonce for an order's badge authorization.
///
/// Keyed by order identifier so that re-running issuance for the same order
/// re-derives the same nonce.
#[must_use]
pub fn nonce_for_order(order_id: &str) -> Digest {
    sha256_parts(&[ORDER_NONCE_SEPARATOR, order_id.as_bytes()])
}

/// An unsigned authorization payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAuthorization {
    /// Claim context (selects separator and validity window).
    pub domain: ClaimDomain,

    /// Wallet permitted to redeem.
    pub recipient: Address,

    /// Asset contract the claim targets.
    pub contract: Address,

    /// Token identifier within the contract.
    pub token_id: u64,

    /// Quantity permitted.
    pub quantity: u64,

    /// Single-use nonce.
    #[serde(with = "crate::crypto::hash::serde_hex_digest")]
    pub nonce: Digest,

    /// Expiry deadline, Unix seconds.
    pub deadline_secs: u64,
}

impl ClaimAuthorization {
    /// Computes the domain-separated signing digest.
    ///
    /// All multi-byte integers are fixed-width big-endian so the external
    /// verifier can reproduce the digest byte-exactly.
    #[must_use]
    pub fn signing_digest(&self) -> Digest {
        sha256_parts(&[
            self.domain.separator(),
            self.recipient.as_bytes(),
            self.contract.as_bytes(),
            &self.token_id.to_be_bytes(),
            &self.quantity.to_be_bytes(),
            &self.nonce,
            &self.deadline_secs.to_be_bytes(),
        ])
    }

    /// Validates the deadline as "now plus a bounded window".
    ///
    /// # Errors
    ///
    /// Returns `DeadlineExpired` if the deadline is not strictly in the
    /// future and `DeadlineBeyondWindow` if it overshoots the domain's
    /// window.
    pub fn check_deadline(&self, now_secs: u64) -> Result<(), AuthError> {
        if self.deadline_secs <= now_secs {
            return Err(AuthError::DeadlineExpired {
                deadline: self.deadline_secs,
                now: now_secs,
            });
        }
        let window_secs = self.domain.validity_window_secs();
        if self.deadline_secs > now_secs.saturating_add(window_secs) {
            return Err(AuthError::DeadlineBeyondWindow {
                deadline: self.deadline_secs,
                now: now_secs,
                window_secs,
            });
        }
        Ok(())
    }

    /// Signs the payload, producing a redeemable authorization.
    #[must_use]
    pub fn sign(&self, signer: &TicketSigner) -> SignedAuthorization {
        let digest = self.signing_digest();
        SignedAuthorization {
            authorization: self.clone(),
            signature: signer.sign(&digest).to_vec(),
            signer_public: signer.public_key().to_vec(),
        }
    }
}

/// A signed authorization: payload plus signature and signer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAuthorization {
    /// The signed payload.
    pub authorization: ClaimAuthorization,

    /// Ed25519 signature over the signing digest.
    #[serde(with = "crate::crypto::hash::serde_hex_bytes")]
    pub signature: Vec<u8>,

    /// Verifying key the external contract checks against.
    #[serde(with = "crate::crypto::hash::serde_hex_bytes")]
    pub signer_public: Vec<u8>,
}

impl SignedAuthorization {
    /// Verifies the signature against the embedded payload and key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or signature bytes are malformed or the
    /// signature does not verify.
    pub fn verify(&self) -> Result<(), AuthError> {
        let digest = self.authorization.signing_digest();
        verify_signature(&self.signer_public, &digest, &self.signature)?;
        Ok(())
    }

    /// Constant-time comparison against another authorization's signature.
    ///
    /// Used by issuance to assert that a re-derived payload matches the
    /// stored one before touching the row.
    #[must_use]
    pub fn signature_matches(&self, other_signature: &[u8]) -> bool {
        if self.signature.len() != SIGNATURE_SIZE || other_signature.len() != SIGNATURE_SIZE {
            return false;
        }
        self.signature.ct_eq(other_signature).into()
    }
}
