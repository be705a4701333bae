//! Check-in accumulator.
//!
//! A check-in appends to the append-only check-in log and accrues two
//! ledgers at once: the (wallet, event) eligibility record and the wallet's
//! loyalty points. There is deliberately no rate limit of any kind — every
//! call strictly increases eligibility.

use merit_core::address::Address;
use tracing::debug;

use crate::ServiceContext;
use crate::error::ServiceError;
use crate::store::now_secs;

/// The outcome of one check-in, returned so the caller can display progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinOutcome {
    /// Row id of the appended check-in.
    pub checkin_id: u64,
    /// Cumulative claimable amount after this check-in.
    pub cumulative_amount: u128,
    /// Total check-ins for this (wallet, event) pair.
    pub checkin_count: u64,
    /// Loyalty points awarded by this check-in.
    pub points_awarded: u64,
    /// The wallet's loyalty point total after the award.
    pub points_total: u64,
}

/// Records a check-in for `wallet` on `event_id`.
///
/// The event must exist; when it declares a time window, the check-in must
/// fall inside it.
///
/// # Errors
///
/// Returns `EventNotFound` for an unknown event, `InvalidState` outside the
/// event window, and storage errors otherwise.
pub fn record_checkin(
    ctx: &ServiceContext,
    event_id: &str,
    wallet: &Address,
    code: Option<&str>,
) -> Result<CheckinOutcome, ServiceError> {
    let event = ctx
        .store
        .get_event(event_id)?
        .ok_or_else(|| ServiceError::EventNotFound {
            event_id: event_id.to_string(),
        })?;

    let now = now_secs();
    if let Some(starts_at) = event.starts_at {
        if now < starts_at {
            return Err(ServiceError::InvalidState {
                reason: format!("event {event_id} has not started"),
            });
        }
    }
    if let Some(ends_at) = event.ends_at {
        if now > ends_at {
            return Err(ServiceError::InvalidState {
                reason: format!("event {event_id} has ended"),
            });
        }
    }

    let accrual = ctx.store.record_checkin(
        event_id,
        wallet,
        code,
        u128::from(ctx.config.per_checkin_amount),
        ctx.config.points_per_checkin,
        now,
    )?;

    debug!(
        event_id,
        wallet = %wallet,
        amount = %accrual.amount,
        count = accrual.checkin_count,
        "check-in recorded"
    );

    Ok(CheckinOutcome {
        checkin_id: accrual.checkin_id,
        cumulative_amount: accrual.amount,
        checkin_count: accrual.checkin_count,
        points_awarded: ctx.config.points_per_checkin,
        points_total: accrual.points,
    })
}
