//! Typed request/response messages for the operations surface.
//!
//! Incoming payloads are tagged enums with plain-string address fields;
//! parsing and validation happen at the dispatch boundary so malformed
//! input becomes a machine-readable error, never a raw parse failure
//! propagated to the caller.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::tickets::{BadgeTicket, EligibilityTicket};

/// A request to the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Record a check-in for the caller's wallet.
    Checkin {
        /// Event to check in on.
        event_id: String,
        /// The caller's wallet; must match the caller's identity.
        wallet: String,
        /// Optional short code displayed by the venue.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Fetch the airdrop eligibility ticket for the caller's wallet.
    GetEligibility {
        /// Event to query.
        event_id: String,
        /// The wallet whose record is requested.
        wallet: String,
    },

    /// Fetch the caller's loyalty point total.
    GetPoints {
        /// The wallet whose points are requested.
        wallet: String,
    },

    /// Fetch the badge ticket for one order.
    GetBadgeTicketByOrder {
        /// The order to query.
        order_id: String,
    },

    /// Fetch the badge ticket for the caller's latest completed order of a
    /// product.
    GetBadgeTicketByProduct {
        /// The product to query.
        product_id: String,
    },

    /// Create an event (operator).
    CreateEvent {
        /// New event identifier.
        event_id: String,
        /// Display name.
        name: String,
        /// Optional window start, Unix seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        starts_at: Option<u64>,
        /// Optional window end, Unix seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ends_at: Option<u64>,
    },

    /// Create a product (operator).
    CreateProduct {
        /// New product identifier.
        product_id: String,
        /// Display name.
        name: String,
        /// Badge contract address, if the product mints a badge.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        badge_contract: Option<String>,
        /// Token identifier within the badge contract.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        badge_token_id: Option<u64>,
    },

    /// Create a pending order (operator).
    CreateOrder {
        /// New order identifier.
        order_id: String,
        /// Buyer wallet.
        buyer: String,
        /// Purchased product.
        product_id: String,
        /// Purchased quantity.
        quantity: u64,
    },

    /// Complete a pending order and drive badge issuance (operator).
    CompleteOrder {
        /// The order to complete.
        order_id: String,
    },

    /// Build and commit the event's distribution batch (operator).
    GenerateBatch {
        /// The event to commit.
        event_id: String,
        /// Roster cap.
        max_claimers: u64,
    },

    /// Record that an external claim was consumed (operator).
    MarkClaimed {
        /// Which claim was consumed.
        target: MarkClaimedTarget,
    },
}

/// The claim a [`Request::MarkClaimed`] reconciliation refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkClaimedTarget {
    /// A badge claim, keyed by order.
    Badge {
        /// The owning order.
        order_id: String,
    },
    /// An airdrop claim, keyed by wallet and event.
    Eligibility {
        /// The claimed event.
        event_id: String,
        /// The claiming wallet.
        wallet: String,
    },
}

/// A successful response from the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    /// Accrual outcome of a check-in.
    Checkin {
        /// Row id of the appended check-in.
        checkin_id: u64,
        /// Cumulative claimable amount after this check-in.
        cumulative_amount: u128,
        /// Total check-ins for this (wallet, event) pair.
        checkin_count: u64,
        /// Loyalty points awarded by this check-in.
        points_awarded: u64,
        /// The wallet's loyalty point total after the award.
        points_total: u64,
    },

    /// Airdrop eligibility ticket.
    Eligibility(EligibilityTicket),

    /// Loyalty point total.
    Points {
        /// The queried wallet.
        wallet: String,
        /// The point total.
        points: u64,
    },

    /// Badge claim ticket.
    BadgeTicket(BadgeTicket),

    /// Event creation acknowledgement.
    EventCreated {
        /// The created event.
        event_id: String,
    },

    /// Product creation acknowledgement.
    ProductCreated {
        /// The created product.
        product_id: String,
    },

    /// Order creation acknowledgement.
    OrderCreated {
        /// The created order.
        order_id: String,
    },

    /// Order completion acknowledgement.
    OrderCompleted {
        /// The completed order.
        order_id: String,
        /// Whether a badge issuance exists for the order.
        badge_issued: bool,
    },

    /// Batch commitment summary.
    Batch {
        /// The committed event.
        event_id: String,
        /// Hex-encoded Merkle root.
        root: String,
        /// Sum of all committed amounts.
        total_amount: u128,
        /// Number of committed claims.
        claim_count: u64,
        /// Roster size before the cap.
        roster_size: u64,
    },

    /// Reconciliation acknowledgement.
    Marked,
}

/// Wire rendering of a [`ServiceError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable reason code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let json = r#"{"op":"checkin","event_id":"launch","wallet":"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa","code":"GM"}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(request, Request::Checkin { .. }));
    }

    #[test]
    fn test_mark_claimed_target_shape() {
        let json = r#"{"op":"mark_claimed","target":{"kind":"badge","order_id":"order-1"}}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            request,
            Request::MarkClaimed {
                target: MarkClaimedTarget::Badge { .. }
            }
        ));
    }

    #[test]
    fn test_error_body_carries_code() {
        let err = ServiceError::SignerUnavailable;
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, "SIGNER_UNAVAILABLE");
        assert!(!body.message.is_empty());
    }
}
