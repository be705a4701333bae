//! Badge issuance state machine.
//!
//! Driven by order lifecycle transitions: when an order reaches `completed`
//! and its product declares a badge contract, exactly one signed issuance is
//! upserted, keyed by the order id. Every input to the authorization — the
//! nonce (derived from the order id), the deadline (completion time plus the
//! badge validity window), and the signature (Ed25519, deterministic) — is a
//! pure function of the order, so replaying the completion handler re-derives
//! the identical payload instead of duplicating or mutating the row.
//!
//! The `ISSUED → CLAIMED` transition belongs to the external verifier; this
//! module never flips the flag itself.

use merit_core::auth::{BADGE_CLAIM_VALIDITY_SECS, ClaimAuthorization, ClaimDomain, nonce_for_order};
use tracing::{debug, info};

use crate::ServiceContext;
use crate::error::ServiceError;
use crate::store::{BadgeIssueRecord, OrderRecord, OrderStatus, now_secs};

/// Outcome of driving the issuance machine for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeIssueOutcome {
    /// An issuance exists (created now or re-derived unchanged).
    Issued(BadgeIssueRecord),
    /// The product declares no badge contract; nothing to issue.
    NoBadgeContract,
}

/// Ensures the badge issuance for a completed order exists.
///
/// Idempotent: invoked every time the order-completion handler runs, and
/// safe to replay.
///
/// # Errors
///
/// Returns `OrderNotFound` for an unknown order, `OrderNotCompleted` before
/// completion, `SignerUnavailable` when no signing key is configured, and
/// `InvalidState` if a stored issuance disagrees with the re-derived payload
/// under the same nonce.
pub fn ensure_badge_issue(
    ctx: &ServiceContext,
    order_id: &str,
) -> Result<BadgeIssueOutcome, ServiceError> {
    let order = ctx
        .store
        .get_order(order_id)?
        .ok_or_else(|| ServiceError::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    if order.status != OrderStatus::Completed {
        return Err(ServiceError::OrderNotCompleted {
            order_id: order_id.to_string(),
        });
    }

    let product =
        ctx.store
            .get_product(&order.product_id)?
            .ok_or_else(|| ServiceError::ProductNotFound {
                product_id: order.product_id.clone(),
            })?;

    let Some(badge_contract) = product.badge_contract else {
        debug!(order_id, product_id = %order.product_id, "product has no badge contract");
        return Ok(BadgeIssueOutcome::NoBadgeContract);
    };
    let token_id = product.badge_token_id.unwrap_or(0);

    let signer = ctx.signer.as_ref().ok_or(ServiceError::SignerUnavailable)?;

    let completed_at = order
        .completed_at
        .ok_or_else(|| ServiceError::InvalidState {
            reason: format!("order {order_id} is completed but has no completion time"),
        })?;

    let authorization = ClaimAuthorization {
        domain: ClaimDomain::BadgeClaim,
        recipient: order.buyer,
        contract: badge_contract,
        token_id,
        quantity: order.quantity,
        nonce: nonce_for_order(order_id),
        deadline_secs: completed_at + BADGE_CLAIM_VALIDITY_SECS,
    };
    let signed = authorization.sign(signer);

    // A (recipient, nonce) pair must never be bound to a different payload.
    // The payload is a pure function of the order, so a mismatch means the
    // order or product rows were mutated after issuance; reject rather than
    // silently re-binding the nonce.
    if let Some(existing) = ctx.store.get_badge_issue(order_id)? {
        if existing.nonce == authorization.nonce && !signed.signature_matches(&existing.signature)
        {
            return Err(ServiceError::InvalidState {
                reason: format!(
                    "stored authorization for order {order_id} does not match the \
                     re-derived payload"
                ),
            });
        }
    }

    let record = BadgeIssueRecord {
        order_id: order_id.to_string(),
        buyer: order.buyer,
        badge_contract,
        token_id,
        quantity: order.quantity,
        nonce: authorization.nonce,
        deadline: authorization.deadline_secs,
        signature: signed.signature,
        signer_public: signed.signer_public,
        claimed: false,
        issued_at: completed_at,
    };
    ctx.store.upsert_badge_issue(&record)?;

    info!(order_id, buyer = %order.buyer, contract = %badge_contract, "badge issuance ensured");

    // Read back so callers observe the durable row (claimed flag included).
    let stored = ctx
        .store
        .get_badge_issue(order_id)?
        .ok_or_else(|| ServiceError::InvalidState {
            reason: format!("badge issuance for order {order_id} vanished mid-upsert"),
        })?;
    Ok(BadgeIssueOutcome::Issued(stored))
}

/// Completes a pending order and drives the issuance machine.
///
/// Completion is idempotent; a cancelled order cannot be completed.
///
/// # Errors
///
/// Returns `OrderNotFound` for an unknown order and `InvalidState` for a
/// cancelled one.
pub fn complete_order(
    ctx: &ServiceContext,
    order_id: &str,
) -> Result<(OrderRecord, BadgeIssueOutcome), ServiceError> {
    let order = ctx
        .store
        .get_order(order_id)?
        .ok_or_else(|| ServiceError::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    if order.status == OrderStatus::Cancelled {
        return Err(ServiceError::InvalidState {
            reason: format!("order {order_id} is cancelled"),
        });
    }

    ctx.store.complete_order(order_id, now_secs())?;
    let completed = ctx
        .store
        .get_order(order_id)?
        .ok_or_else(|| ServiceError::OrderNotFound {
            order_id: order_id.to_string(),
        })?;

    let outcome = ensure_badge_issue(ctx, order_id)?;
    Ok((completed, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, seed_badge_order, test_context, test_context_without_signer};

    #[test]
    fn test_unknown_order() {
        let ctx = test_context();
        let result = ensure_badge_issue(&ctx, "missing");
        assert!(matches!(result, Err(ServiceError::OrderNotFound { .. })));
    }

    #[test]
    fn test_pending_order_rejected() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);
        let result = ensure_badge_issue(&ctx, "order-1");
        assert!(matches!(result, Err(ServiceError::OrderNotCompleted { .. })));
    }

    #[test]
    fn test_issue_on_completion_and_replay() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);

        let (order, outcome) = complete_order(&ctx, "order-1").unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        let BadgeIssueOutcome::Issued(first) = outcome else {
            panic!("expected an issuance");
        };
        assert_eq!(first.deadline, order.completed_at.unwrap() + BADGE_CLAIM_VALIDITY_SECS);

        // Replaying the completion handler re-derives the identical payload.
        let (_, outcome) = complete_order(&ctx, "order-1").unwrap();
        let BadgeIssueOutcome::Issued(second) = outcome else {
            panic!("expected an issuance");
        };
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_badge_contract_is_not_an_error() {
        let ctx = test_context();
        seed_badge_order(&ctx, "order-1", addr(0xaa), false);
        let (_, outcome) = complete_order(&ctx, "order-1").unwrap();
        assert_eq!(outcome, BadgeIssueOutcome::NoBadgeContract);
        assert!(ctx.store.get_badge_issue("order-1").unwrap().is_none());
    }

    #[test]
    fn test_signerless_deployment_fails_closed() {
        let ctx = test_context_without_signer();
        seed_badge_order(&ctx, "order-1", addr(0xaa), true);
        let result = complete_order(&ctx, "order-1");
        assert!(matches!(result, Err(ServiceError::SignerUnavailable)));
    }
}
