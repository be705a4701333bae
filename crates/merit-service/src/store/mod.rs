//! `SQLite`-backed persistence for the merit service.
//!
//! One [`SqliteStore`] owns the connection (WAL mode for concurrent reads)
//! and exposes typed operations over the roster, batch, order, and issuance
//! tables. Every multi-row mutation is a single transaction, and every
//! conditionally-created row is an upsert keyed by a uniqueness constraint —
//! storage-level atomicity is the only concurrency mechanism this service
//! relies on.
//!
//! Amounts are `u128` persisted as decimal text; `SQLite` integers are
//! 64-bit signed.

// SQLite returns i64 for row IDs and counts, but they're always non-negative.
// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc
)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use merit_core::address::Address;
use merit_core::crypto::hash::{Digest, decode_digest};
use merit_core::merkle::RosterEntry;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted value failed to decode (bad amount, address, or proof).
    #[error("corrupt row in {table}: {details}")]
    CorruptRow {
        /// The table holding the bad row.
        table: &'static str,
        /// What failed to decode.
        details: String,
    },

    /// Adding the accrual would overflow the amount column.
    #[error("eligibility amount overflow for wallet {wallet} on event {event_id}")]
    AmountOverflow {
        /// The affected wallet.
        wallet: String,
        /// The affected event.
        event_id: String,
    },
}

/// Current Unix time in whole seconds.
#[must_use]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// An operator-created event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Event identifier.
    pub event_id: String,
    /// Display name.
    pub name: String,
    /// Optional window start, Unix seconds.
    pub starts_at: Option<u64>,
    /// Optional window end, Unix seconds.
    pub ends_at: Option<u64>,
    /// Creation time, Unix seconds.
    pub created_at: u64,
}

/// Cumulative eligibility for one (wallet, event) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityRecord {
    /// The eligible wallet.
    pub wallet: Address,
    /// The event the eligibility was accrued on.
    pub event_id: String,
    /// Cumulative claimable amount; never decreases.
    pub amount: u128,
    /// Number of check-ins recorded.
    pub checkin_count: u64,
    /// Time of the most recent check-in, Unix seconds.
    pub last_checkin_at: u64,
    /// Whether the external verifier has consumed this claim.
    pub claimed: bool,
    /// Leaf position in the committed batch, if one exists.
    pub leaf_index: Option<u64>,
    /// Inclusion proof for the committed batch, if one exists.
    pub proof: Option<Vec<Digest>>,
    /// Event id of the batch the proof belongs to.
    pub batch_event_id: Option<String>,
}

/// The per-event Merkle batch commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRecord {
    /// The event this batch commits.
    pub event_id: String,
    /// The Merkle root.
    pub root: Digest,
    /// External distributor contract address.
    pub distributor: Address,
    /// Sum of all committed amounts.
    pub total_amount: u128,
    /// Number of committed claims.
    pub claim_count: u64,
    /// Operator that generated the batch.
    pub created_by: String,
    /// First generation time, Unix seconds.
    pub created_at: u64,
    /// Most recent regeneration time, Unix seconds.
    pub updated_at: u64,
}

/// A purchasable product, optionally badge-eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    /// Product identifier.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Badge contract address, if this product mints a badge.
    pub badge_contract: Option<Address>,
    /// Token identifier within the badge contract.
    pub badge_token_id: Option<u64>,
    /// Creation time, Unix seconds.
    pub created_at: u64,
}

/// Purchase order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Created, payment not yet confirmed.
    Pending,
    /// Payment confirmed; terminal for this subsystem.
    Completed,
    /// Cancelled before completion.
    Cancelled,
}

impl OrderStatus {
    /// Returns the persisted status string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    fn parse(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StoreError::CorruptRow {
                table: "orders",
                details: format!("unknown status {other:?}"),
            }),
        }
    }
}

/// A purchase order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    /// Order identifier.
    pub order_id: String,
    /// Buyer wallet.
    pub buyer: Address,
    /// Purchased product.
    pub product_id: String,
    /// Purchased quantity.
    pub quantity: u64,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Creation time, Unix seconds.
    pub created_at: u64,
    /// Completion time, Unix seconds; set when status reaches completed.
    pub completed_at: Option<u64>,
}

/// A signed badge issuance, keyed by its owning order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeIssueRecord {
    /// Owning order identifier.
    pub order_id: String,
    /// Buyer wallet permitted to claim.
    pub buyer: Address,
    /// Badge contract address.
    pub badge_contract: Address,
    /// Token identifier within the contract.
    pub token_id: u64,
    /// Quantity authorized.
    pub quantity: u64,
    /// Single-use nonce.
    pub nonce: Digest,
    /// Authorization deadline, Unix seconds.
    pub deadline: u64,
    /// Ed25519 signature over the authorization digest.
    pub signature: Vec<u8>,
    /// Verifying key the signature was produced under.
    pub signer_public: Vec<u8>,
    /// Whether the external verifier has consumed this claim.
    pub claimed: bool,
    /// First issuance time, Unix seconds.
    pub issued_at: u64,
}

/// The accrual outcome of one check-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinAccrual {
    /// Row id of the appended check-in.
    pub checkin_id: u64,
    /// New cumulative claimable amount.
    pub amount: u128,
    /// New check-in count.
    pub checkin_count: u64,
    /// The wallet's loyalty point total after the award.
    pub points: u64,
}

/// A proof placement produced by batch generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofAssignment {
    /// The wallet the proof belongs to.
    pub wallet: Address,
    /// The wallet's leaf position.
    pub leaf_index: u64,
    /// Ordered sibling list.
    pub proof: Vec<Digest>,
}

/// The durable store backing all service operations.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates a store at the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::initialize_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn initialize_connection(conn: &Connection) -> Result<(), StoreError> {
        // Schema includes the PRAGMA statements.
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ───────────────────────── events ─────────────────────────

    /// Inserts a new event.
    ///
    /// # Errors
    ///
    /// Returns a database error if the event id already exists.
    pub fn insert_event(&self, event: &EventRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO events (event_id, name, starts_at, ends_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.event_id,
                event.name,
                event.starts_at,
                event.ends_at,
                event.created_at,
            ],
        )?;
        Ok(())
    }

    /// Fetches an event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_event(&self, event_id: &str) -> Result<Option<EventRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT event_id, name, starts_at, ends_at, created_at
                 FROM events WHERE event_id = ?1",
                params![event_id],
                |row| {
                    Ok(EventRecord {
                        event_id: row.get(0)?,
                        name: row.get(1)?,
                        starts_at: row.get::<_, Option<i64>>(2)?.map(|v| v as u64),
                        ends_at: row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
                        created_at: row.get::<_, i64>(4)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    // ──────────────────────── check-ins ───────────────────────

    /// Appends a check-in and accrues eligibility and loyalty points in one
    /// transaction.
    ///
    /// The eligibility upsert only ever adds, so the cumulative amount is
    /// monotonically non-decreasing by construction.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; on error nothing is written.
    pub fn record_checkin(
        &self,
        event_id: &str,
        wallet: &Address,
        code: Option<&str>,
        amount_delta: u128,
        points_delta: u64,
        now: u64,
    ) -> Result<CheckinAccrual, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let wallet_hex = wallet.to_hex();

        tx.execute(
            "INSERT INTO checkins (event_id, wallet, code, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![event_id, wallet_hex, code, now],
        )?;
        let checkin_id = tx.last_insert_rowid() as u64;

        let existing: Option<(String, i64)> = tx
            .query_row(
                "SELECT amount, checkin_count FROM eligibility
                 WHERE wallet = ?1 AND event_id = ?2",
                params![wallet_hex, event_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (current_amount, current_count) = match existing {
            Some((raw, count)) => (parse_amount("eligibility", &raw)?, count as u64),
            None => (0, 0),
        };
        let new_amount =
            current_amount
                .checked_add(amount_delta)
                .ok_or_else(|| StoreError::AmountOverflow {
                    wallet: wallet_hex.clone(),
                    event_id: event_id.to_string(),
                })?;
        let new_count = current_count + 1;

        tx.execute(
            "INSERT INTO eligibility (wallet, event_id, amount, checkin_count, last_checkin_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(wallet, event_id) DO UPDATE SET
                 amount = excluded.amount,
                 checkin_count = excluded.checkin_count,
                 last_checkin_at = excluded.last_checkin_at",
            params![
                wallet_hex,
                event_id,
                new_amount.to_string(),
                new_count,
                now
            ],
        )?;

        tx.execute(
            "INSERT INTO loyalty_points (wallet, points, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(wallet) DO UPDATE SET
                 points = loyalty_points.points + excluded.points,
                 updated_at = excluded.updated_at",
            params![wallet_hex, points_delta, now],
        )?;
        let points: i64 = tx.query_row(
            "SELECT points FROM loyalty_points WHERE wallet = ?1",
            params![wallet_hex],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(CheckinAccrual {
            checkin_id,
            amount: new_amount,
            checkin_count: new_count,
            points: points as u64,
        })
    }

    /// Fetches the eligibility record for a (wallet, event) pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_eligibility(
        &self,
        wallet: &Address,
        event_id: &str,
    ) -> Result<Option<EligibilityRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT wallet, event_id, amount, checkin_count, last_checkin_at,
                        claimed, leaf_index, proof, batch_event_id
                 FROM eligibility WHERE wallet = ?1 AND event_id = ?2",
                params![wallet.to_hex(), event_id],
                RawEligibilityRow::from_row,
            )
            .optional()?;
        raw.map(RawEligibilityRow::decode).transpose()
    }

    /// Reads the finalized roster for an event, ordered by wallet and capped
    /// at `limit` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or any row is corrupt.
    pub fn roster_for_event(
        &self,
        event_id: &str,
        limit: u64,
    ) -> Result<Vec<RosterEntry>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT wallet, amount FROM eligibility
             WHERE event_id = ?1
             ORDER BY wallet ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![event_id, limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(wallet, amount)| {
                Ok(RosterEntry {
                    address: parse_address("eligibility", &wallet)?,
                    amount: parse_amount("eligibility", &amount)?,
                })
            })
            .collect()
    }

    /// Counts the event's eligibility records already consumed externally.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn claimed_count_for_event(&self, event_id: &str) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM eligibility WHERE event_id = ?1 AND claimed = 1",
            params![event_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Marks a (wallet, event) eligibility claim as externally consumed.
    ///
    /// Returns `false` if the row was missing or already marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_eligibility_claimed(
        &self,
        wallet: &Address,
        event_id: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE eligibility SET claimed = 1
             WHERE wallet = ?1 AND event_id = ?2 AND claimed = 0",
            params![wallet.to_hex(), event_id],
        )?;
        Ok(changed > 0)
    }

    // ───────────────────────── batches ────────────────────────

    /// Upserts the event's batch row and writes every proof assignment in
    /// one transaction.
    ///
    /// On regeneration the batch row keeps its original creator and creation
    /// time; root, totals, and the per-record proofs are replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails; on error nothing is written.
    pub fn commit_batch(
        &self,
        batch: &BatchRecord,
        assignments: &[ProofAssignment],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO merkle_batches
                 (event_id, root, distributor, total_amount, claim_count,
                  created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(event_id) DO UPDATE SET
                 root = excluded.root,
                 distributor = excluded.distributor,
                 total_amount = excluded.total_amount,
                 claim_count = excluded.claim_count,
                 updated_at = excluded.updated_at",
            params![
                batch.event_id,
                hex::encode(batch.root),
                batch.distributor.to_hex(),
                batch.total_amount.to_string(),
                batch.claim_count,
                batch.created_by,
                batch.created_at,
                batch.updated_at,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "UPDATE eligibility
                 SET leaf_index = ?1, proof = ?2, batch_event_id = ?3
                 WHERE wallet = ?4 AND event_id = ?5",
            )?;
            for assignment in assignments {
                let proof_json = encode_proof(&assignment.proof);
                stmt.execute(params![
                    assignment.leaf_index,
                    proof_json,
                    batch.event_id,
                    assignment.wallet.to_hex(),
                    batch.event_id,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Fetches the batch row for an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_batch(&self, event_id: &str) -> Result<Option<BatchRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT event_id, root, distributor, total_amount, claim_count,
                        created_by, created_at, updated_at
                 FROM merkle_batches WHERE event_id = ?1",
                params![event_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                },
            )
            .optional()?;

        raw.map(
            |(event_id, root, distributor, total, count, created_by, created_at, updated_at)| {
                Ok(BatchRecord {
                    event_id,
                    root: decode_digest(&root).map_err(|err| StoreError::CorruptRow {
                        table: "merkle_batches",
                        details: err.to_string(),
                    })?,
                    distributor: parse_address("merkle_batches", &distributor)?,
                    total_amount: parse_amount("merkle_batches", &total)?,
                    claim_count: count as u64,
                    created_by,
                    created_at: created_at as u64,
                    updated_at: updated_at as u64,
                })
            },
        )
        .transpose()
    }

    // ──────────────────── products and orders ─────────────────

    /// Inserts a new product.
    ///
    /// # Errors
    ///
    /// Returns a database error if the product id already exists.
    pub fn insert_product(&self, product: &ProductRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO products (product_id, name, badge_contract, badge_token_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                product.product_id,
                product.name,
                product.badge_contract.map(|a| a.to_hex()),
                product.badge_token_id,
                product.created_at,
            ],
        )?;
        Ok(())
    }

    /// Fetches a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_product(&self, product_id: &str) -> Result<Option<ProductRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT product_id, name, badge_contract, badge_token_id, created_at
                 FROM products WHERE product_id = ?1",
                params![product_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;

        raw.map(|(product_id, name, contract, token_id, created_at)| {
            Ok(ProductRecord {
                product_id,
                name,
                badge_contract: contract
                    .map(|raw| parse_address("products", &raw))
                    .transpose()?,
                badge_token_id: token_id.map(|v| v as u64),
                created_at: created_at as u64,
            })
        })
        .transpose()
    }

    /// Inserts a new order.
    ///
    /// # Errors
    ///
    /// Returns a database error if the order id already exists.
    pub fn insert_order(&self, order: &OrderRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO orders
                 (order_id, buyer, product_id, quantity, status, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                order.order_id,
                order.buyer.to_hex(),
                order.product_id,
                order.quantity,
                order.status.as_str(),
                order.created_at,
                order.completed_at,
            ],
        )?;
        Ok(())
    }

    /// Fetches an order by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT order_id, buyer, product_id, quantity, status, created_at, completed_at
                 FROM orders WHERE order_id = ?1",
                params![order_id],
                RawOrderRow::from_row,
            )
            .optional()?;
        raw.map(RawOrderRow::decode).transpose()
    }

    /// Transitions a pending order to completed, stamping the completion
    /// time. A no-op if the order is already completed or cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn complete_order(&self, order_id: &str, now: u64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE orders SET status = 'completed', completed_at = ?2
             WHERE order_id = ?1 AND status = 'pending'",
            params![order_id, now],
        )?;
        Ok(())
    }

    /// Finds the buyer's most recently completed order for a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn latest_completed_order(
        &self,
        buyer: &Address,
        product_id: &str,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT order_id, buyer, product_id, quantity, status, created_at, completed_at
                 FROM orders
                 WHERE buyer = ?1 AND product_id = ?2 AND status = 'completed'
                 ORDER BY completed_at DESC
                 LIMIT 1",
                params![buyer.to_hex(), product_id],
                RawOrderRow::from_row,
            )
            .optional()?;
        raw.map(RawOrderRow::decode).transpose()
    }

    // ────────────────────── badge issuance ────────────────────

    /// Upserts a badge issuance keyed by order id.
    ///
    /// Re-issuance replaces the payload columns; the claimed flag and first
    /// issuance time are never touched, so an externally consumed claim can
    /// never be un-consumed by a replay of the completion handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn upsert_badge_issue(&self, issue: &BadgeIssueRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO badge_issues
                 (order_id, buyer, badge_contract, token_id, quantity, nonce,
                  deadline, signature, signer_public, claimed, issued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(order_id) DO UPDATE SET
                 buyer = excluded.buyer,
                 badge_contract = excluded.badge_contract,
                 token_id = excluded.token_id,
                 quantity = excluded.quantity,
                 nonce = excluded.nonce,
                 deadline = excluded.deadline,
                 signature = excluded.signature,
                 signer_public = excluded.signer_public",
            params![
                issue.order_id,
                issue.buyer.to_hex(),
                issue.badge_contract.to_hex(),
                issue.token_id,
                issue.quantity,
                hex::encode(issue.nonce),
                issue.deadline,
                hex::encode(&issue.signature),
                hex::encode(&issue.signer_public),
                issue.claimed,
                issue.issued_at,
            ],
        )?;
        Ok(())
    }

    /// Fetches the badge issuance for an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_badge_issue(&self, order_id: &str) -> Result<Option<BadgeIssueRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                "SELECT order_id, buyer, badge_contract, token_id, quantity, nonce,
                        deadline, signature, signer_public, claimed, issued_at
                 FROM badge_issues WHERE order_id = ?1",
                params![order_id],
                RawBadgeIssueRow::from_row,
            )
            .optional()?;
        raw.map(RawBadgeIssueRow::decode).transpose()
    }

    /// Marks a badge issuance as externally consumed.
    ///
    /// Returns `false` if the row was missing or already marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_badge_claimed(&self, order_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE badge_issues SET claimed = 1
             WHERE order_id = ?1 AND claimed = 0",
            params![order_id],
        )?;
        Ok(changed > 0)
    }

    // ─────────────────────── loyalty points ───────────────────

    /// Returns the wallet's loyalty point total.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_points(&self, wallet: &Address) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let points: Option<i64> = conn
            .query_row(
                "SELECT points FROM loyalty_points WHERE wallet = ?1",
                params![wallet.to_hex()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(points.unwrap_or(0) as u64)
    }
}

// ───────────────────────── row decoding ─────────────────────────

struct RawEligibilityRow {
    wallet: String,
    event_id: String,
    amount: String,
    checkin_count: i64,
    last_checkin_at: i64,
    claimed: bool,
    leaf_index: Option<i64>,
    proof: Option<String>,
    batch_event_id: Option<String>,
}

impl RawEligibilityRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            wallet: row.get(0)?,
            event_id: row.get(1)?,
            amount: row.get(2)?,
            checkin_count: row.get(3)?,
            last_checkin_at: row.get(4)?,
            claimed: row.get(5)?,
            leaf_index: row.get(6)?,
            proof: row.get(7)?,
            batch_event_id: row.get(8)?,
        })
    }

    fn decode(self) -> Result<EligibilityRecord, StoreError> {
        Ok(EligibilityRecord {
            wallet: parse_address("eligibility", &self.wallet)?,
            event_id: self.event_id,
            amount: parse_amount("eligibility", &self.amount)?,
            checkin_count: self.checkin_count as u64,
            last_checkin_at: self.last_checkin_at as u64,
            claimed: self.claimed,
            leaf_index: self.leaf_index.map(|v| v as u64),
            proof: self.proof.as_deref().map(decode_proof).transpose()?,
            batch_event_id: self.batch_event_id,
        })
    }
}

struct RawOrderRow {
    order_id: String,
    buyer: String,
    product_id: String,
    quantity: i64,
    status: String,
    created_at: i64,
    completed_at: Option<i64>,
}

impl RawOrderRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            buyer: row.get(1)?,
            product_id: row.get(2)?,
            quantity: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            completed_at: row.get(6)?,
        })
    }

    fn decode(self) -> Result<OrderRecord, StoreError> {
        Ok(OrderRecord {
            order_id: self.order_id,
            buyer: parse_address("orders", &self.buyer)?,
            product_id: self.product_id,
            quantity: self.quantity as u64,
            status: OrderStatus::parse(&self.status)?,
            created_at: self.created_at as u64,
            completed_at: self.completed_at.map(|v| v as u64),
        })
    }
}

struct RawBadgeIssueRow {
    order_id: String,
    buyer: String,
    badge_contract: String,
    token_id: i64,
    quantity: i64,
    nonce: String,
    deadline: i64,
    signature: String,
    signer_public: String,
    claimed: bool,
    issued_at: i64,
}

impl RawBadgeIssueRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            buyer: row.get(1)?,
            badge_contract: row.get(2)?,
            token_id: row.get(3)?,
            quantity: row.get(4)?,
            nonce: row.get(5)?,
            deadline: row.get(6)?,
            signature: row.get(7)?,
            signer_public: row.get(8)?,
            claimed: row.get(9)?,
            issued_at: row.get(10)?,
        })
    }

    fn decode(self) -> Result<BadgeIssueRecord, StoreError> {
        Ok(BadgeIssueRecord {
            order_id: self.order_id,
            buyer: parse_address("badge_issues", &self.buyer)?,
            badge_contract: parse_address("badge_issues", &self.badge_contract)?,
            token_id: self.token_id as u64,
            quantity: self.quantity as u64,
            nonce: decode_digest(&self.nonce).map_err(|err| StoreError::CorruptRow {
                table: "badge_issues",
                details: err.to_string(),
            })?,
            deadline: self.deadline as u64,
            signature: hex::decode(&self.signature).map_err(|err| StoreError::CorruptRow {
                table: "badge_issues",
                details: err.to_string(),
            })?,
            signer_public: hex::decode(&self.signer_public).map_err(|err| {
                StoreError::CorruptRow {
                    table: "badge_issues",
                    details: err.to_string(),
                }
            })?,
            claimed: self.claimed,
            issued_at: self.issued_at as u64,
        })
    }
}

fn parse_amount(table: &'static str, raw: &str) -> Result<u128, StoreError> {
    raw.parse::<u128>().map_err(|err| StoreError::CorruptRow {
        table,
        details: format!("bad amount {raw:?}: {err}"),
    })
}

fn parse_address(table: &'static str, raw: &str) -> Result<Address, StoreError> {
    Address::from_hex(raw).map_err(|err| StoreError::CorruptRow {
        table,
        details: err.to_string(),
    })
}

fn encode_proof(proof: &[Digest]) -> String {
    let hexes: Vec<String> = proof.iter().map(hex::encode).collect();
    // Serializing a Vec<String> cannot fail.
    serde_json::to_string(&hexes).unwrap_or_default()
}

fn decode_proof(raw: &str) -> Result<Vec<Digest>, StoreError> {
    let hexes: Vec<String> =
        serde_json::from_str(raw).map_err(|err| StoreError::CorruptRow {
            table: "eligibility",
            details: format!("bad proof payload: {err}"),
        })?;
    hexes
        .iter()
        .map(|entry| {
            decode_digest(entry).map_err(|err| StoreError::CorruptRow {
                table: "eligibility",
                details: err.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(tag: u8) -> Address {
        Address::new([tag; merit_core::address::ADDRESS_SIZE])
    }

    fn store_with_event(event_id: &str) -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_event(&EventRecord {
                event_id: event_id.to_string(),
                name: "Launch Week".to_string(),
                starts_at: None,
                ends_at: None,
                created_at: 1_700_000_000,
            })
            .unwrap();
        store
    }

    #[test]
    fn test_checkin_accrues_monotonically() {
        let store = store_with_event("launch");
        let wallet = addr(0xaa);

        let mut last_amount = 0u128;
        for round in 1..=3u64 {
            let accrual = store
                .record_checkin("launch", &wallet, Some("GM"), 1000, 10, 1_700_000_000 + round)
                .unwrap();
            assert_eq!(accrual.amount, u128::from(round) * 1000);
            assert_eq!(accrual.checkin_count, round);
            assert_eq!(accrual.points, round * 10);
            assert!(accrual.amount >= last_amount);
            last_amount = accrual.amount;
        }

        let record = store.get_eligibility(&wallet, "launch").unwrap().unwrap();
        assert_eq!(record.amount, 3000);
        assert_eq!(record.checkin_count, 3);
        assert!(!record.claimed);
        assert!(record.proof.is_none());
    }

    #[test]
    fn test_roster_ordered_by_wallet_and_capped() {
        let store = store_with_event("launch");
        for tag in [0x30u8, 0x10, 0x20] {
            store
                .record_checkin("launch", &addr(tag), None, 500, 5, 1_700_000_100)
                .unwrap();
        }

        let roster = store.roster_for_event("launch", 10).unwrap();
        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].address, addr(0x10));
        assert_eq!(roster[1].address, addr(0x20));
        assert_eq!(roster[2].address, addr(0x30));

        let capped = store.roster_for_event("launch", 2).unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn test_commit_batch_upserts_in_place() {
        let store = store_with_event("launch");
        let wallet = addr(0x10);
        store
            .record_checkin("launch", &wallet, None, 1000, 10, 1_700_000_100)
            .unwrap();

        let first = BatchRecord {
            event_id: "launch".to_string(),
            root: [0x01; 32],
            distributor: addr(0xdd),
            total_amount: 1000,
            claim_count: 1,
            created_by: "ops".to_string(),
            created_at: 1_700_000_200,
            updated_at: 1_700_000_200,
        };
        store
            .commit_batch(
                &first,
                &[ProofAssignment {
                    wallet,
                    leaf_index: 0,
                    proof: vec![[0xab; 32]],
                }],
            )
            .unwrap();

        let second = BatchRecord {
            root: [0x02; 32],
            created_by: "someone-else".to_string(),
            created_at: 1_700_000_900,
            updated_at: 1_700_000_900,
            ..first.clone()
        };
        store.commit_batch(&second, &[]).unwrap();

        let stored = store.get_batch("launch").unwrap().unwrap();
        assert_eq!(stored.root, [0x02; 32]);
        // Creator and creation time survive regeneration.
        assert_eq!(stored.created_by, "ops");
        assert_eq!(stored.created_at, 1_700_000_200);
        assert_eq!(stored.updated_at, 1_700_000_900);

        let record = store.get_eligibility(&wallet, "launch").unwrap().unwrap();
        assert_eq!(record.leaf_index, Some(0));
        assert_eq!(record.proof, Some(vec![[0xab; 32]]));
        assert_eq!(record.batch_event_id.as_deref(), Some("launch"));
    }

    #[test]
    fn test_complete_order_is_idempotent() {
        let store = store_with_event("launch");
        store
            .insert_product(&ProductRecord {
                product_id: "poster".to_string(),
                name: "Poster".to_string(),
                badge_contract: None,
                badge_token_id: None,
                created_at: 1_700_000_000,
            })
            .unwrap();
        store
            .insert_order(&OrderRecord {
                order_id: "order-1".to_string(),
                buyer: addr(0xaa),
                product_id: "poster".to_string(),
                quantity: 1,
                status: OrderStatus::Pending,
                created_at: 1_700_000_000,
                completed_at: None,
            })
            .unwrap();

        store.complete_order("order-1", 1_700_000_500).unwrap();
        let order = store.get_order("order-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.completed_at, Some(1_700_000_500));

        // Second completion leaves the original timestamp alone.
        store.complete_order("order-1", 1_700_009_999).unwrap();
        let order = store.get_order("order-1").unwrap().unwrap();
        assert_eq!(order.completed_at, Some(1_700_000_500));
    }

    #[test]
    fn test_badge_upsert_preserves_claimed_flag() {
        let store = store_with_event("launch");
        store
            .insert_product(&ProductRecord {
                product_id: "jacket".to_string(),
                name: "Jacket".to_string(),
                badge_contract: Some(addr(0xbb)),
                badge_token_id: Some(7),
                created_at: 1_700_000_000,
            })
            .unwrap();
        store
            .insert_order(&OrderRecord {
                order_id: "order-2".to_string(),
                buyer: addr(0xaa),
                product_id: "jacket".to_string(),
                quantity: 1,
                status: OrderStatus::Completed,
                created_at: 1_700_000_000,
                completed_at: Some(1_700_000_100),
            })
            .unwrap();

        let issue = BadgeIssueRecord {
            order_id: "order-2".to_string(),
            buyer: addr(0xaa),
            badge_contract: addr(0xbb),
            token_id: 7,
            quantity: 1,
            nonce: [0xcc; 32],
            deadline: 1_700_604_900,
            signature: vec![0x11; 64],
            signer_public: vec![0x22; 32],
            claimed: false,
            issued_at: 1_700_000_100,
        };
        store.upsert_badge_issue(&issue).unwrap();
        assert!(store.mark_badge_claimed("order-2").unwrap());
        assert!(!store.mark_badge_claimed("order-2").unwrap());

        // A replayed upsert must not resurrect the claim.
        store.upsert_badge_issue(&issue).unwrap();
        let stored = store.get_badge_issue("order-2").unwrap().unwrap();
        assert!(stored.claimed);
        assert_eq!(stored.issued_at, 1_700_000_100);
    }

    #[test]
    fn test_mark_eligibility_claimed_once() {
        let store = store_with_event("launch");
        let wallet = addr(0xaa);
        store
            .record_checkin("launch", &wallet, None, 1000, 10, 1_700_000_100)
            .unwrap();

        assert!(store.mark_eligibility_claimed(&wallet, "launch").unwrap());
        assert!(!store.mark_eligibility_claimed(&wallet, "launch").unwrap());
        assert_eq!(store.claimed_count_for_event("launch").unwrap(), 1);
    }

    #[test]
    fn test_points_default_to_zero() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get_points(&addr(0x01)).unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merit.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_event(&EventRecord {
                    event_id: "persisted".to_string(),
                    name: "Persisted".to_string(),
                    starts_at: None,
                    ends_at: None,
                    created_at: 1,
                })
                .unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.get_event("persisted").unwrap().is_some());
    }
}
