//! Claim ticket read paths.
//!
//! Serves the proof or signed payload a wallet needs for external
//! redemption. Two disciplines apply everywhere:
//!
//! - **Ownership**: the caller's proven wallet must match the stored record
//!   owner, checked before anything else so a foreign caller always sees
//!   `FORBIDDEN` regardless of record state.
//! - **Polling-friendliness**: "not ready yet" (no issuance, batch not
//!   committed, no check-ins) is a `claimable: false` / `ready: false`
//!   response, never an error.

use merit_core::address::Address;
use merit_core::auth::{ClaimAuthorization, ClaimDomain, SignedAuthorization};
use serde::{Deserialize, Serialize};

use crate::ServiceContext;
use crate::error::ServiceError;
use crate::store::{BadgeIssueRecord, OrderStatus};

/// A badge claim ticket, or the reason one is not available yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeTicket {
    /// Whether a redeemable authorization is attached.
    pub claimable: bool,
    /// Why the ticket is not claimable, when it is not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The owning order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Badge contract address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// Token identifier within the contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u64>,
    /// Whether the external verifier has already consumed the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed: Option<bool>,
    /// The signed authorization payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<SignedAuthorization>,
}

impl BadgeTicket {
    fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            claimable: false,
            reason: Some(reason.into()),
            order_id: None,
            contract_address: None,
            token_id: None,
            claimed: None,
            authorization: None,
        }
    }

    fn from_issue(issue: BadgeIssueRecord) -> Self {
        let authorization = SignedAuthorization {
            authorization: ClaimAuthorization {
                domain: ClaimDomain::BadgeClaim,
                recipient: issue.buyer,
                contract: issue.badge_contract,
                token_id: issue.token_id,
                quantity: issue.quantity,
                nonce: issue.nonce,
                deadline_secs: issue.deadline,
            },
            signature: issue.signature,
            signer_public: issue.signer_public,
        };
        Self {
            claimable: !issue.claimed,
            reason: issue.claimed.then(|| "already claimed".to_string()),
            order_id: Some(issue.order_id),
            contract_address: Some(issue.badge_contract),
            token_id: Some(issue.token_id),
            claimed: Some(issue.claimed),
            authorization: Some(authorization),
        }
    }
}

/// An airdrop eligibility ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityTicket {
    /// Whether the wallet has any eligibility on the event.
    pub eligible: bool,
    /// Whether a committed batch proof is attached.
    pub ready: bool,
    /// Why the ticket is not ready, when it is not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Cumulative claimable amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u128>,
    /// Check-ins recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkin_count: Option<u64>,
    /// Leaf position in the committed batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u64>,
    /// Hex-encoded inclusion proof, leaf level upward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof: Option<Vec<String>>,
    /// Hex-encoded committed root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// External distributor contract address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributor: Option<Address>,
    /// Whether the external verifier has already consumed the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed: Option<bool>,
}

impl EligibilityTicket {
    fn not_eligible(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            ready: false,
            reason: Some(reason.into()),
            amount: None,
            checkin_count: None,
            leaf_index: None,
            proof: None,
            root: None,
            distributor: None,
            claimed: None,
        }
    }
}

/// Returns the badge ticket for an order.
///
/// # Errors
///
/// Returns `OrderNotFound` for an unknown order, `Forbidden` when the caller
/// is not the buyer, and `OrderNotCompleted` before completion.
pub fn badge_ticket_by_order(
    ctx: &ServiceContext,
    caller: &Address,
    order_id: &str,
) -> Result<BadgeTicket, ServiceError> {
    let order = ctx
        .store
        .get_order(order_id)?
        .ok_or_else(|| ServiceError::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    // Ownership first: a foreign caller learns nothing about order state.
    if order.buyer != *caller {
        return Err(ServiceError::Forbidden {
            reason: format!("order {order_id} belongs to another wallet"),
        });
    }

    if order.status != OrderStatus::Completed {
        return Err(ServiceError::OrderNotCompleted {
            order_id: order_id.to_string(),
        });
    }

    match ctx.store.get_badge_issue(order_id)? {
        Some(issue) => Ok(BadgeTicket::from_issue(issue)),
        None => {
            let product = ctx.store.get_product(&order.product_id)?;
            let reason = match product {
                Some(p) if p.badge_contract.is_none() => "product has no badge contract",
                _ => "authorization not issued yet",
            };
            Ok(BadgeTicket::not_ready(reason))
        }
    }
}

/// Returns the badge ticket for the caller's most recent completed order of
/// a product.
///
/// Missing orders and pending issuance are both polling responses, not
/// errors.
///
/// # Errors
///
/// Returns `ProductNotFound` for an unknown product and storage errors
/// otherwise.
pub fn badge_ticket_by_product(
    ctx: &ServiceContext,
    caller: &Address,
    product_id: &str,
) -> Result<BadgeTicket, ServiceError> {
    let product =
        ctx.store
            .get_product(product_id)?
            .ok_or_else(|| ServiceError::ProductNotFound {
                product_id: product_id.to_string(),
            })?;

    if product.badge_contract.is_none() {
        return Ok(BadgeTicket::not_ready("product has no badge contract"));
    }

    let Some(order) = ctx.store.latest_completed_order(caller, product_id)? else {
        return Ok(BadgeTicket::not_ready(
            "no completed order for this product",
        ));
    };

    match ctx.store.get_badge_issue(&order.order_id)? {
        Some(issue) => Ok(BadgeTicket::from_issue(issue)),
        None => Ok(BadgeTicket::not_ready("authorization not issued yet")),
    }
}

/// Returns the airdrop eligibility ticket for a (wallet, event) pair.
///
/// The caller must be the wallet in question; zero check-ins is a
/// `{eligible: false}` response, and an uncommitted batch is
/// `{eligible: true, ready: false}`.
///
/// # Errors
///
/// Returns `Forbidden` for a foreign caller, `EventNotFound` for an unknown
/// event, and storage errors otherwise.
pub fn eligibility_ticket(
    ctx: &ServiceContext,
    caller: &Address,
    event_id: &str,
    wallet: &Address,
) -> Result<EligibilityTicket, ServiceError> {
    if caller != wallet {
        return Err(ServiceError::Forbidden {
            reason: "eligibility records are readable only by their wallet".to_string(),
        });
    }

    ctx.store
        .get_event(event_id)?
        .ok_or_else(|| ServiceError::EventNotFound {
            event_id: event_id.to_string(),
        })?;

    let Some(record) = ctx.store.get_eligibility(wallet, event_id)? else {
        return Ok(EligibilityTicket::not_eligible("no check-ins recorded"));
    };

    let batch = ctx.store.get_batch(event_id)?;
    match (record.leaf_index, record.proof, batch) {
        (Some(leaf_index), Some(proof), Some(batch)) => Ok(EligibilityTicket {
            eligible: true,
            ready: true,
            reason: None,
            amount: Some(record.amount),
            checkin_count: Some(record.checkin_count),
            leaf_index: Some(leaf_index),
            proof: Some(proof.iter().map(hex::encode).collect()),
            root: Some(hex::encode(batch.root)),
            distributor: Some(batch.distributor),
            claimed: Some(record.claimed),
        }),
        _ => Ok(EligibilityTicket {
            eligible: true,
            ready: false,
            reason: Some("batch not committed".to_string()),
            amount: Some(record.amount),
            checkin_count: Some(record.checkin_count),
            leaf_index: None,
            proof: None,
            root: None,
            distributor: None,
            claimed: Some(record.claimed),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::complete_order;
    use crate::checkin::record_checkin;
    use crate::distribution::generate_batch;
    use crate::store::EventRecord;
    use crate::testing::{addr, seed_badge_order, test_context};

    #[test]
    fn test_foreign_caller_forbidden_regardless_of_status() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);

        // Pending: still forbidden before any status information leaks.
        let result = badge_ticket_by_order(&ctx, &addr(0xbb), "order-1");
        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));

        complete_order(&ctx, "order-1").unwrap();
        let result = badge_ticket_by_order(&ctx, &addr(0xbb), "order-1");
        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[test]
    fn test_owner_sees_pending_as_invalid_state() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);
        let result = badge_ticket_by_order(&ctx, &addr(0xaa), "order-1");
        assert!(matches!(result, Err(ServiceError::OrderNotCompleted { .. })));
    }

    #[test]
    fn test_ticket_by_order_after_completion() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);
        complete_order(&ctx, "order-1").unwrap();

        let ticket = badge_ticket_by_order(&ctx, &addr(0xaa), "order-1").unwrap();
        assert!(ticket.claimable);
        let authorization = ticket.authorization.unwrap();
        authorization.verify().unwrap();
        assert_eq!(authorization.authorization.recipient, addr(0xaa));
    }

    #[test]
    fn test_ticket_by_product_polls_without_errors() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);

        // Order exists but is pending: polling response, not an error.
        let ticket = badge_ticket_by_product(&ctx, &addr(0xaa), "product-order-1").unwrap();
        assert!(!ticket.claimable);
        assert!(ticket.reason.is_some());

        complete_order(&ctx, "order-1").unwrap();
        let ticket = badge_ticket_by_product(&ctx, &addr(0xaa), "product-order-1").unwrap();
        assert!(ticket.claimable);
    }

    #[test]
    fn test_eligibility_requires_matching_wallet() {
        let ctx = test_context();
        let result = eligibility_ticket(&ctx, &addr(0xbb), "launch", &addr(0xaa));
        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[test]
    fn test_eligibility_lifecycle() {
        let ctx = test_context();
        ctx.store
            .insert_event(&EventRecord {
                event_id: "launch".to_string(),
                name: "Launch Week".to_string(),
                starts_at: None,
                ends_at: None,
                created_at: 0,
            })
            .unwrap();
        let wallet = addr(0xaa);

        // No check-ins: not eligible, not an error.
        let ticket = eligibility_ticket(&ctx, &wallet, "launch", &wallet).unwrap();
        assert!(!ticket.eligible);

        record_checkin(&ctx, "launch", &wallet, None).unwrap();

        // Eligible, but no batch yet.
        let ticket = eligibility_ticket(&ctx, &wallet, "launch", &wallet).unwrap();
        assert!(ticket.eligible);
        assert!(!ticket.ready);
        assert_eq!(ticket.amount, Some(1000));

        generate_batch(&ctx, "ops", "launch", 100).unwrap();
        let ticket = eligibility_ticket(&ctx, &wallet, "launch", &wallet).unwrap();
        assert!(ticket.ready);
        assert!(ticket.proof.is_some());
        assert!(ticket.root.is_some());
        assert_eq!(ticket.claimed, Some(false));
    }
}
