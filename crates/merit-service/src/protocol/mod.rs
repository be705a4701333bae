//! Request dispatch with caller identity enforcement.
//!
//! Every mutating operation other than check-in requires the operator
//! identity; read-of-own-data operations require the caller's proven wallet
//! to match the record owner. The dispatcher is a pure function over the
//! [`ServiceContext`] — identity and context both arrive from the caller,
//! never from module state.

mod messages;

pub use messages::{ErrorBody, MarkClaimedTarget, Request, Response};

use merit_core::address::Address;
use tracing::warn;

use crate::ServiceContext;
use crate::badge::{BadgeIssueOutcome, complete_order};
use crate::checkin::record_checkin;
use crate::distribution::generate_batch;
use crate::error::ServiceError;
use crate::store::{EventRecord, OrderRecord, OrderStatus, ProductRecord, now_secs};
use crate::tickets::{badge_ticket_by_order, badge_ticket_by_product, eligibility_ticket};

/// Name recorded as the creator of operator-generated artifacts.
const OPERATOR_ACTOR: &str = "operator";

/// The authenticated caller.
///
/// Authentication itself (session tokens, wallet signatures) happens at the
/// transport boundary; by the time a request reaches dispatch the identity
/// is proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// An authenticated operator.
    Operator,
    /// An authenticated wallet owner.
    Wallet(Address),
}

impl Identity {
    fn require_operator(self) -> Result<(), ServiceError> {
        match self {
            Self::Operator => Ok(()),
            Self::Wallet(_) => Err(ServiceError::Forbidden {
                reason: "operator identity required".to_string(),
            }),
        }
    }

    fn require_wallet(self) -> Result<Address, ServiceError> {
        match self {
            Self::Wallet(address) => Ok(address),
            Self::Operator => Err(ServiceError::Forbidden {
                reason: "wallet identity required".to_string(),
            }),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::MalformedRequest {
            reason: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

fn parse_wallet(field: &str, raw: &str) -> Result<Address, ServiceError> {
    Address::from_hex(raw).map_err(|err| ServiceError::MalformedRequest {
        reason: format!("{field}: {err}"),
    })
}

/// Dispatches one request under the caller's identity.
///
/// # Errors
///
/// Returns the operation's error, already classified with a stable reason
/// code; see [`ServiceError::code`].
pub fn dispatch(
    ctx: &ServiceContext,
    identity: Identity,
    request: Request,
) -> Result<Response, ServiceError> {
    match request {
        Request::Checkin {
            event_id,
            wallet,
            code,
        } => {
            require_non_empty("event_id", &event_id)?;
            let wallet = parse_wallet("wallet", &wallet)?;
            let caller = identity.require_wallet()?;
            if caller != wallet {
                return Err(ServiceError::Forbidden {
                    reason: "check-ins can only be recorded for the caller's wallet".to_string(),
                });
            }
            let outcome = record_checkin(ctx, &event_id, &wallet, code.as_deref())?;
            Ok(Response::Checkin {
                checkin_id: outcome.checkin_id,
                cumulative_amount: outcome.cumulative_amount,
                checkin_count: outcome.checkin_count,
                points_awarded: outcome.points_awarded,
                points_total: outcome.points_total,
            })
        }

        Request::GetEligibility { event_id, wallet } => {
            require_non_empty("event_id", &event_id)?;
            let wallet = parse_wallet("wallet", &wallet)?;
            let caller = identity.require_wallet()?;
            let ticket = eligibility_ticket(ctx, &caller, &event_id, &wallet)?;
            Ok(Response::Eligibility(ticket))
        }

        Request::GetPoints { wallet } => {
            let wallet = parse_wallet("wallet", &wallet)?;
            let caller = identity.require_wallet()?;
            if caller != wallet {
                return Err(ServiceError::Forbidden {
                    reason: "loyalty points are readable only by their wallet".to_string(),
                });
            }
            let points = ctx.store.get_points(&wallet)?;
            Ok(Response::Points {
                wallet: wallet.to_hex(),
                points,
            })
        }

        Request::GetBadgeTicketByOrder { order_id } => {
            require_non_empty("order_id", &order_id)?;
            let caller = identity.require_wallet()?;
            let ticket = badge_ticket_by_order(ctx, &caller, &order_id)?;
            Ok(Response::BadgeTicket(ticket))
        }

        Request::GetBadgeTicketByProduct { product_id } => {
            require_non_empty("product_id", &product_id)?;
            let caller = identity.require_wallet()?;
            let ticket = badge_ticket_by_product(ctx, &caller, &product_id)?;
            Ok(Response::BadgeTicket(ticket))
        }

        Request::CreateEvent {
            event_id,
            name,
            starts_at,
            ends_at,
        } => {
            identity.require_operator()?;
            require_non_empty("event_id", &event_id)?;
            require_non_empty("name", &name)?;
            if let (Some(start), Some(end)) = (starts_at, ends_at) {
                if end < start {
                    return Err(ServiceError::MalformedRequest {
                        reason: "ends_at precedes starts_at".to_string(),
                    });
                }
            }
            if ctx.store.get_event(&event_id)?.is_some() {
                return Err(ServiceError::InvalidState {
                    reason: format!("event {event_id} already exists"),
                });
            }
            ctx.store.insert_event(&EventRecord {
                event_id: event_id.clone(),
                name,
                starts_at,
                ends_at,
                created_at: now_secs(),
            })?;
            Ok(Response::EventCreated { event_id })
        }

        Request::CreateProduct {
            product_id,
            name,
            badge_contract,
            badge_token_id,
        } => {
            identity.require_operator()?;
            require_non_empty("product_id", &product_id)?;
            require_non_empty("name", &name)?;
            let badge_contract = badge_contract
                .as_deref()
                .map(|raw| parse_wallet("badge_contract", raw))
                .transpose()?;
            if ctx.store.get_product(&product_id)?.is_some() {
                return Err(ServiceError::InvalidState {
                    reason: format!("product {product_id} already exists"),
                });
            }
            ctx.store.insert_product(&ProductRecord {
                product_id: product_id.clone(),
                name,
                badge_contract,
                badge_token_id,
                created_at: now_secs(),
            })?;
            Ok(Response::ProductCreated { product_id })
        }

        Request::CreateOrder {
            order_id,
            buyer,
            product_id,
            quantity,
        } => {
            identity.require_operator()?;
            require_non_empty("order_id", &order_id)?;
            require_non_empty("product_id", &product_id)?;
            let buyer = parse_wallet("buyer", &buyer)?;
            if quantity == 0 {
                return Err(ServiceError::MalformedRequest {
                    reason: "quantity must be positive".to_string(),
                });
            }
            if ctx.store.get_product(&product_id)?.is_none() {
                return Err(ServiceError::ProductNotFound { product_id });
            }
            if ctx.store.get_order(&order_id)?.is_some() {
                return Err(ServiceError::InvalidState {
                    reason: format!("order {order_id} already exists"),
                });
            }
            ctx.store.insert_order(&OrderRecord {
                order_id: order_id.clone(),
                buyer,
                product_id,
                quantity,
                status: OrderStatus::Pending,
                created_at: now_secs(),
                completed_at: None,
            })?;
            Ok(Response::OrderCreated { order_id })
        }

        Request::CompleteOrder { order_id } => {
            identity.require_operator()?;
            require_non_empty("order_id", &order_id)?;
            let (order, outcome) = complete_order(ctx, &order_id)?;
            Ok(Response::OrderCompleted {
                order_id: order.order_id,
                badge_issued: matches!(outcome, BadgeIssueOutcome::Issued(_)),
            })
        }

        Request::GenerateBatch {
            event_id,
            max_claimers,
        } => {
            identity.require_operator()?;
            require_non_empty("event_id", &event_id)?;
            if max_claimers == 0 {
                return Err(ServiceError::MalformedRequest {
                    reason: "max_claimers must be positive".to_string(),
                });
            }
            let summary = generate_batch(ctx, OPERATOR_ACTOR, &event_id, max_claimers)?;
            Ok(Response::Batch {
                event_id: summary.event_id,
                root: hex::encode(summary.root),
                total_amount: summary.total_amount,
                claim_count: summary.claim_count,
                roster_size: summary.roster_size,
            })
        }

        Request::MarkClaimed { target } => {
            identity.require_operator()?;
            match target {
                MarkClaimedTarget::Badge { order_id } => {
                    require_non_empty("order_id", &order_id)?;
                    let issue = ctx.store.get_badge_issue(&order_id)?.ok_or_else(|| {
                        ServiceError::OrderNotFound {
                            order_id: order_id.clone(),
                        }
                    })?;
                    if issue.claimed {
                        return Err(ServiceError::AlreadyClaimed {
                            reason: format!("badge for order {order_id}"),
                        });
                    }
                    ctx.store.mark_badge_claimed(&order_id)?;
                }
                MarkClaimedTarget::Eligibility { event_id, wallet } => {
                    require_non_empty("event_id", &event_id)?;
                    let wallet = parse_wallet("wallet", &wallet)?;
                    let record = ctx
                        .store
                        .get_eligibility(&wallet, &event_id)?
                        .ok_or_else(|| ServiceError::EligibilityNotFound {
                            wallet: wallet.to_hex(),
                            event_id: event_id.clone(),
                        })?;
                    if record.batch_event_id.is_none() {
                        warn!(event_id = %event_id, wallet = %wallet, "claim reported before batch commit");
                        return Err(ServiceError::InvalidState {
                            reason: format!("no batch committed for event {event_id}"),
                        });
                    }
                    if record.claimed {
                        return Err(ServiceError::AlreadyClaimed {
                            reason: format!("eligibility for wallet {wallet} on event {event_id}"),
                        });
                    }
                    ctx.store.mark_eligibility_claimed(&wallet, &event_id)?;
                }
            }
            Ok(Response::Marked)
        }
    }
}
