//! Diesel row models for wallet persistence.

use super::schema::{ledger_postings, ledger_transactions, wallets};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Wallet balance row, used for both reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WalletRow {
    /// Wallet owner.
    pub user_id: String,
    /// Balance in cents.
    pub balance_cents: i64,
    /// Last balance change.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for ledger entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ledger_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LedgerTransactionRow {
    /// Transaction identifier.
    pub id: uuid::Uuid,
    /// Wallet owner.
    pub user_id: String,
    /// Related task, if any.
    pub task_id: Option<uuid::Uuid>,
    /// Signed amount in cents.
    pub amount_cents: i64,
    /// Entry kind.
    pub kind: String,
    /// Description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for ledger entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ledger_transactions)]
pub struct NewLedgerTransactionRow {
    /// Transaction identifier.
    pub id: uuid::Uuid,
    /// Wallet owner.
    pub user_id: String,
    /// Related task, if any.
    pub task_id: Option<uuid::Uuid>,
    /// Signed amount in cents.
    pub amount_cents: i64,
    /// Entry kind.
    pub kind: String,
    /// Description.
    pub description: String,
    /// Idempotency key of the owning posting.
    pub posting_key: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for posting keys.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ledger_postings)]
pub struct NewPostingRow {
    /// Idempotency key.
    pub idempotency_key: String,
    /// Posting timestamp.
    pub created_at: DateTime<Utc>,
}
