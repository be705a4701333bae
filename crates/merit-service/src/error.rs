//! Service error taxonomy.
//!
//! Validation and state errors return synchronously to the caller with a
//! machine-readable reason code ([`ServiceError::code`]); nothing in this
//! crate retries on its own. "Not ready" outcomes — eligibility before a
//! batch commits, badge tickets before issuance — are response payloads,
//! never errors, so polling clients can tell them apart from hard failures.

use merit_core::address::Address;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the service operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// The referenced event does not exist.
    #[error("event not found: {event_id}")]
    EventNotFound {
        /// The missing event identifier.
        event_id: String,
    },

    /// The referenced order does not exist.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The missing order identifier.
        order_id: String,
    },

    /// The referenced product does not exist.
    #[error("product not found: {product_id}")]
    ProductNotFound {
        /// The missing product identifier.
        product_id: String,
    },

    /// No eligibility record exists for the (wallet, event) pair.
    #[error("no eligibility record for wallet {wallet} on event {event_id}")]
    EligibilityNotFound {
        /// The queried wallet.
        wallet: String,
        /// The queried event.
        event_id: String,
    },

    /// The caller's wallet does not own the requested record.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Why the caller was rejected.
        reason: String,
    },

    /// The operation is valid but the record is in the wrong state.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Why the state was rejected.
        reason: String,
    },

    /// The order has not reached `completed`.
    #[error("order {order_id} is not completed")]
    OrderNotCompleted {
        /// The order in question.
        order_id: String,
    },

    /// Batch generation found no eligible wallets.
    #[error("empty roster for event {event_id}")]
    EmptyRoster {
        /// The event with no roster.
        event_id: String,
    },

    /// The roster contains the same wallet twice.
    #[error("duplicate roster entry for address {address}")]
    DuplicateEntry {
        /// The duplicated wallet.
        address: Address,
    },

    /// The claim has already been consumed externally.
    #[error("already claimed: {reason}")]
    AlreadyClaimed {
        /// Which record was already claimed.
        reason: String,
    },

    /// External claims have begun; the batch root must not change.
    #[error("batch for event {event_id} is frozen: external claims have begun")]
    BatchFrozen {
        /// The event whose batch is frozen.
        event_id: String,
    },

    /// No signing key is configured in this deployment.
    #[error("no signing key configured")]
    SignerUnavailable,

    /// The request failed boundary validation (empty or malformed fields).
    #[error("malformed request: {reason}")]
    MalformedRequest {
        /// Which field was rejected and why.
        reason: String,
    },

    /// Storage-layer failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable reason code for client branching.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EventNotFound { .. }
            | Self::OrderNotFound { .. }
            | Self::ProductNotFound { .. }
            | Self::EligibilityNotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidState { .. }
            | Self::OrderNotCompleted { .. }
            | Self::BatchFrozen { .. } => "INVALID_STATE",
            Self::EmptyRoster { .. } => "EMPTY_ROSTER",
            Self::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            Self::AlreadyClaimed { .. } => "ALREADY_CLAIMED",
            Self::SignerUnavailable => "SIGNER_UNAVAILABLE",
            Self::MalformedRequest { .. } => "EMPTY_INPUT",
            Self::Storage(_) => "STORAGE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            ServiceError::EventNotFound {
                event_id: "e".into()
            }
            .code(),
            "NOT_FOUND"
        );
        assert_eq!(
            ServiceError::Forbidden {
                reason: "r".into()
            }
            .code(),
            "FORBIDDEN"
        );
        assert_eq!(
            ServiceError::OrderNotCompleted {
                order_id: "o".into()
            }
            .code(),
            "INVALID_STATE"
        );
        assert_eq!(
            ServiceError::BatchFrozen {
                event_id: "e".into()
            }
            .code(),
            "INVALID_STATE"
        );
        assert_eq!(
            ServiceError::EmptyRoster {
                event_id: "e".into()
            }
            .code(),
            "EMPTY_ROSTER"
        );
        assert_eq!(ServiceError::SignerUnavailable.code(), "SIGNER_UNAVAILABLE");
    }
}
