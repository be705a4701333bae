//! Merkle distribution builder.
//!
//! Converts the event's finalized eligibility roster into a committed batch:
//! one `merkle_batches` row per event (regeneration updates in place) plus a
//! persisted `{leaf_index, proof, batch ref}` on every roster record, so the
//! ticket read path never recomputes the tree.
//!
//! Once any of the event's claims has been consumed externally the batch is
//! frozen: regenerating the root would silently invalidate every proof
//! already in the wild, so the operation is rejected instead.

use merit_core::crypto::hash::Digest;
use merit_core::merkle::{DistributionTree, MerkleError};
use tracing::info;

use crate::ServiceContext;
use crate::error::ServiceError;
use crate::store::{BatchRecord, ProofAssignment, now_secs};

/// Summary of a committed batch, returned to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// The committed event.
    pub event_id: String,
    /// The Merkle root.
    pub root: Digest,
    /// Sum of all committed amounts.
    pub total_amount: u128,
    /// Number of committed claims.
    pub claim_count: u64,
    /// Roster size before the `max_claimers` cap.
    pub roster_size: u64,
}

/// Builds and commits the event's distribution batch.
///
/// The roster is the event's eligibility records ordered by wallet and
/// capped at `max_claimers`; ordering by the unique wallet key makes
/// regeneration deterministic for an unchanged roster.
///
/// # Errors
///
/// Returns `EventNotFound` for an unknown event, `BatchFrozen` once external
/// claims have begun, `EmptyRoster`/`DuplicateEntry` from tree construction,
/// and storage errors otherwise.
pub fn generate_batch(
    ctx: &ServiceContext,
    created_by: &str,
    event_id: &str,
    max_claimers: u64,
) -> Result<BatchSummary, ServiceError> {
    ctx.store
        .get_event(event_id)?
        .ok_or_else(|| ServiceError::EventNotFound {
            event_id: event_id.to_string(),
        })?;

    if ctx.store.claimed_count_for_event(event_id)? > 0 {
        return Err(ServiceError::BatchFrozen {
            event_id: event_id.to_string(),
        });
    }

    let roster = ctx.store.roster_for_event(event_id, max_claimers)?;
    let tree = DistributionTree::build(&roster).map_err(|err| match err {
        MerkleError::EmptyRoster => ServiceError::EmptyRoster {
            event_id: event_id.to_string(),
        },
        MerkleError::DuplicateEntry { address } => ServiceError::DuplicateEntry { address },
        other => ServiceError::InvalidState {
            reason: other.to_string(),
        },
    })?;

    let mut total_amount: u128 = 0;
    let mut assignments = Vec::with_capacity(roster.len());
    for (index, entry) in roster.iter().enumerate() {
        total_amount =
            total_amount
                .checked_add(entry.amount)
                .ok_or_else(|| ServiceError::InvalidState {
                    reason: format!("total amount overflow for event {event_id}"),
                })?;
        let proof = tree.proof(index).map_err(|err| ServiceError::InvalidState {
            reason: err.to_string(),
        })?;
        assignments.push(ProofAssignment {
            wallet: entry.address,
            leaf_index: index as u64,
            proof,
        });
    }

    let now = now_secs();
    let batch = BatchRecord {
        event_id: event_id.to_string(),
        root: tree.root(),
        distributor: ctx.config.distributor,
        total_amount,
        claim_count: roster.len() as u64,
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    };
    ctx.store.commit_batch(&batch, &assignments)?;

    info!(
        event_id,
        root = %hex::encode(batch.root),
        claim_count = batch.claim_count,
        "distribution batch committed"
    );

    Ok(BatchSummary {
        event_id: event_id.to_string(),
        root: batch.root,
        total_amount,
        claim_count: batch.claim_count,
        roster_size: roster.len() as u64,
    })
}
