//! Ledger port: wallet balances and transaction records as one store.

use crate::identity::UserId;
use crate::task::domain::TaskId;
use crate::wallet::domain::{
    IdempotencyKey, LedgerEntry, LedgerPosting, PostingReceipt, Wallet, WalletDomainError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type WalletLedgerResult<T> = Result<T, WalletLedgerError>;

/// Wallet and ledger persistence contract.
///
/// Implementations must apply a posting's balance changes and ledger entries
/// in a single atomic unit: either every leg lands or nothing changes.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Returns the user's wallet, provisioning an empty one stamped
    /// `provisioned_at` when none exists.
    async fn wallet(
        &self,
        user_id: &UserId,
        provisioned_at: DateTime<Utc>,
    ) -> WalletLedgerResult<Wallet>;

    /// Applies a posting atomically, provisioning missing wallets first.
    ///
    /// When the posting carries an idempotency key that has already been
    /// posted, returns the original entries with `replayed = true` and
    /// performs no balance check.
    ///
    /// # Errors
    ///
    /// Returns [`WalletLedgerError::Rejected`] when a leg violates a wallet
    /// rule (for example insufficient funds); no wallet changes in that case.
    async fn post(
        &self,
        posting: &LedgerPosting,
        at: DateTime<Utc>,
    ) -> WalletLedgerResult<PostingReceipt>;

    /// Returns the receipt of an earlier posting made under `key`.
    async fn find_posting(&self, key: &IdempotencyKey)
    -> WalletLedgerResult<Option<PostingReceipt>>;

    /// Returns every entry for `user_id`, oldest first.
    async fn entries_for_user(&self, user_id: &UserId) -> WalletLedgerResult<Vec<LedgerEntry>>;

    /// Returns every entry tagged with `task_id`, oldest first.
    async fn entries_for_task(&self, task_id: TaskId) -> WalletLedgerResult<Vec<LedgerEntry>>;
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum WalletLedgerError {
    /// A leg broke a wallet rule; nothing was written.
    #[error(transparent)]
    Rejected(#[from] WalletDomainError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WalletLedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
