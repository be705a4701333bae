//! Loyalty/airdrop claims service.
//!
//! Users accrue eligibility by performing repeatable event check-ins and
//! later redeem it two ways: fungible-token airdrop claims verified
//! externally against a committed Merkle root, and non-fungible badge claims
//! authorized by off-chain signed tickets tied to completed purchase orders.
//!
//! # Architecture
//!
//! ```text
//! check-in ──▶ eligibility ledger ──▶ distribution builder ──▶ batch + proofs
//!                                                                  │
//! order completed ──▶ badge issuance ──▶ signed authorization      ▼
//!                                              │            claim tickets
//!                                              └────────────▶ (read path)
//! ```
//!
//! Every operation takes an explicit [`ServiceContext`] — storage handle,
//! optional signing key, configuration — owned by the caller rather than by
//! module-level state. Operations are synchronous and single-shot; the only
//! concurrency mechanism is storage-level atomicity (transactions plus
//! upsert-by-unique-key), which suffices because every mutation here is
//! idempotent or monotonic.

pub mod badge;
pub mod checkin;
pub mod config;
pub mod distribution;
pub mod error;
pub mod protocol;
pub mod store;
pub mod tickets;

use merit_core::crypto::sign::TicketSigner;

pub use config::{ConfigError, ServiceConfig};
pub use error::ServiceError;
pub use store::SqliteStore;

/// Request-scoped handles every operation runs against.
///
/// The signer is optional: deployments that defer signing run without a key
/// and issuance operations fail closed with
/// [`ServiceError::SignerUnavailable`].
pub struct ServiceContext {
    /// Durable storage.
    pub store: SqliteStore,
    /// Authorization signing key, when configured.
    pub signer: Option<TicketSigner>,
    /// Service configuration.
    pub config: ServiceConfig,
}

impl ServiceContext {
    /// Bundles the handles into a context.
    #[must_use]
    pub fn new(store: SqliteStore, signer: Option<TicketSigner>, config: ServiceConfig) -> Self {
        Self {
            store,
            signer,
            config,
        }
    }
}
