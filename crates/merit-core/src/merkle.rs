//! Merkle distribution trees for airdrop commitments.
//!
//! Converts a finalized roster of `(address, amount)` pairs into a 32-byte
//! root commitment plus one inclusion proof per roster entry. The external
//! verifier reconstructs the root from a leaf and its ordered sibling list,
//! so the byte layout here is a wire contract and must not drift:
//!
//! - leaf `i` = SHA-256(`i` as u64 big-endian ‖ 20-byte address ‖ amount as
//!   u128 big-endian)
//! - parent = SHA-256(lesser child ‖ greater child): children are sorted
//!   lexicographically before concatenation, so proofs carry no left/right
//!   position bits
//! - a level's odd node out is promoted unchanged to the next level, never
//!   duplicated; proofs therefore vary in length across leaves of the same
//!   tree
//!
//! A wallet appears at most once per roster — eligibility is pre-summed per
//! wallet before the roster is finalized — so duplicate addresses are
//! rejected at build time.

use std::collections::HashSet;

use thiserror::Error;

use crate::address::Address;
use crate::crypto::hash::{Digest, sha256_parts};

/// Maximum accepted inclusion-proof depth (supports rosters up to 2^32).
pub const MAX_PROOF_DEPTH: usize = 32;

/// Errors that can occur when building trees or verifying proofs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The roster has no entries.
    #[error("empty roster: a distribution batch requires at least one entry")]
    EmptyRoster,

    /// The same address appears more than once in the roster.
    #[error("duplicate roster entry for address {address}")]
    DuplicateEntry {
        /// The address that appears more than once.
        address: Address,
    },

    /// A leaf index beyond the roster size was requested.
    #[error("leaf index {index} out of range for roster of {len}")]
    LeafIndexOutOfRange {
        /// The requested leaf index.
        index: usize,
        /// The roster size.
        len: usize,
    },

    /// The proof is longer than any tree this module produces.
    #[error("proof depth {depth} exceeds maximum {max}")]
    ProofDepthExceeded {
        /// The presented proof depth.
        depth: usize,
        /// The maximum accepted depth.
        max: usize,
    },

    /// The proof does not reconstruct the committed root.
    #[error("inclusion proof does not reconstruct the committed root")]
    ProofMismatch,
}

/// One finalized roster entry: an eligible address and its pre-summed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    /// The eligible wallet.
    pub address: Address,
    /// The cumulative claimable amount for that wallet.
    pub amount: u128,
}

/// Computes the leaf digest for roster position `index`.
#[must_use]
pub fn leaf_hash(index: u64, address: &Address, amount: u128) -> Digest {
    sha256_parts(&[
        &index.to_be_bytes(),
        address.as_bytes(),
        &amount.to_be_bytes(),
    ])
}

/// Hashes a node pair, sorting the children first so verification does not
/// need to track sides.
fn node_hash(a: &Digest, b: &Digest) -> Digest {
    if a <= b {
        sha256_parts(&[a, b])
    } else {
        sha256_parts(&[b, a])
    }
}

/// A fully built distribution tree.
///
/// Levels are kept from leaves (level 0) to root, so per-leaf proofs are a
/// walk up the stored levels rather than a rebuild.
#[derive(Debug, Clone)]
pub struct DistributionTree {
    levels: Vec<Vec<Digest>>,
}

impl DistributionTree {
    /// Builds the tree bottom-up from a finalized roster.
    ///
    /// # Errors
    ///
    /// Returns `EmptyRoster` for an empty input and `DuplicateEntry` if any
    /// address appears twice.
    pub fn build(roster: &[RosterEntry]) -> Result<Self, MerkleError> {
        if roster.is_empty() {
            return Err(MerkleError::EmptyRoster);
        }

        let mut seen = HashSet::with_capacity(roster.len());
        for entry in roster {
            if !seen.insert(entry.address) {
                return Err(MerkleError::DuplicateEntry {
                    address: entry.address,
                });
            }
        }

        let leaves: Vec<Digest> = roster
            .iter()
            .enumerate()
            .map(|(index, entry)| leaf_hash(index as u64, &entry.address, entry.amount))
            .collect();

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let previous = &levels[levels.len() - 1];
            let next: Vec<Digest> = previous
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => node_hash(left, right),
                    // Odd node out: promoted unchanged to the next level.
                    [lone] => *lone,
                    _ => unreachable!("chunks(2) yields one- or two-element slices"),
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Returns the root commitment.
    #[must_use]
    pub fn root(&self) -> Digest {
        // build() guarantees the final level holds exactly one node.
        self.levels[self.levels.len() - 1][0]
    }

    /// Returns the number of leaves.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Collects the ordered sibling list for the leaf at `index`.
    ///
    /// Levels where the node was promoted without a sibling contribute
    /// nothing, so proofs for different leaves of the same tree can differ
    /// in length.
    ///
    /// # Errors
    ///
    /// Returns `LeafIndexOutOfRange` if `index` is past the roster.
    pub fn proof(&self, index: usize) -> Result<Vec<Digest>, MerkleError> {
        let len = self.leaf_count();
        if index >= len {
            return Err(MerkleError::LeafIndexOutOfRange { index, len });
        }

        let mut siblings = Vec::new();
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = position ^ 1;
            if sibling < level.len() {
                siblings.push(level[sibling]);
            }
            position /= 2;
        }
        Ok(siblings)
    }
}

/// Recomputes the root from one leaf and its sibling list — the external
/// verifier's algorithm, reproduced for tests and offline tooling.
///
/// # Errors
///
/// Returns `ProofDepthExceeded` for oversized proofs and `ProofMismatch` if
/// the reconstruction does not land on `root`.
pub fn verify_proof(
    root: &Digest,
    index: u64,
    address: &Address,
    amount: u128,
    proof: &[Digest],
) -> Result<(), MerkleError> {
    if proof.len() > MAX_PROOF_DEPTH {
        return Err(MerkleError::ProofDepthExceeded {
            depth: proof.len(),
            max: MAX_PROOF_DEPTH,
        });
    }

    let mut current = leaf_hash(index, address, amount);
    for sibling in proof {
        current = node_hash(&current, sibling);
    }

    if current == *root {
        Ok(())
    } else {
        Err(MerkleError::ProofMismatch)
    }
}
