//! In-memory wallet ledger.

use crate::identity::UserId;
use crate::task::domain::TaskId;
use crate::wallet::{
    domain::{
        IdempotencyKey, LedgerEntry, LedgerPosting, PostingReceipt, TransactionId, Wallet,
        apply_posting,
    },
    ports::{WalletLedger, WalletLedgerError, WalletLedgerResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory ledger.
///
/// A single write lock covers balances, entries, and posting keys, so each
/// posting is atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWalletLedger {
    state: Arc<RwLock<LedgerState>>,
}

#[derive(Debug, Default)]
struct LedgerState {
    wallets: HashMap<UserId, Wallet>,
    entries: Vec<LedgerEntry>,
    postings: HashMap<IdempotencyKey, Vec<TransactionId>>,
}

impl LedgerState {
    fn receipt_for(&self, ids: &[TransactionId]) -> PostingReceipt {
        let entries = ids
            .iter()
            .filter_map(|id| self.entries.iter().find(|entry| entry.id == *id).cloned())
            .collect();
        PostingReceipt {
            entries,
            replayed: true,
        }
    }
}

impl InMemoryWalletLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> WalletLedgerError {
    WalletLedgerError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl WalletLedger for InMemoryWalletLedger {
    async fn wallet(
        &self,
        user_id: &UserId,
        provisioned_at: DateTime<Utc>,
    ) -> WalletLedgerResult<Wallet> {
        let mut state = self.state.write().map_err(lock_error)?;
        let wallet = state
            .wallets
            .entry(user_id.clone())
            .or_insert_with(|| Wallet::provision(user_id.clone(), provisioned_at));
        Ok(wallet.clone())
    }

    async fn post(
        &self,
        posting: &LedgerPosting,
        at: DateTime<Utc>,
    ) -> WalletLedgerResult<PostingReceipt> {
        let mut state = self.state.write().map_err(lock_error)?;
        if let Some(key) = posting.idempotency_key()
            && let Some(ids) = state.postings.get(key)
        {
            return Ok(state.receipt_for(ids));
        }

        let mut working: Vec<Wallet> = posting
            .participants()
            .into_iter()
            .map(|user_id| {
                state
                    .wallets
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| Wallet::provision(user_id, at))
            })
            .collect();
        let entries = apply_posting(posting, &mut working, at)?;

        for wallet in working {
            state.wallets.insert(wallet.user_id().clone(), wallet);
        }
        if let Some(key) = posting.idempotency_key() {
            state
                .postings
                .insert(key.clone(), entries.iter().map(|entry| entry.id).collect());
        }
        state.entries.extend(entries.iter().cloned());

        Ok(PostingReceipt {
            entries,
            replayed: false,
        })
    }

    async fn find_posting(
        &self,
        key: &IdempotencyKey,
    ) -> WalletLedgerResult<Option<PostingReceipt>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.postings.get(key).map(|ids| state.receipt_for(ids)))
    }

    async fn entries_for_user(&self, user_id: &UserId) -> WalletLedgerResult<Vec<LedgerEntry>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn entries_for_task(&self, task_id: TaskId) -> WalletLedgerResult<Vec<LedgerEntry>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .entries
            .iter()
            .filter(|entry| entry.task_id == Some(task_id))
            .cloned()
            .collect())
    }
}
