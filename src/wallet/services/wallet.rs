//! Wallet store operations: balances, credits, debits, transfers, payouts.

use crate::identity::UserId;
use crate::task::domain::TaskId;
use crate::wallet::{
    domain::{
        EntryKind, IdempotencyKey, LedgerEntry, LedgerPosting, Money, PaymentMethodId,
        PostingReceipt, TransactionId, Wallet, WalletDomainError,
    },
    ports::{WalletLedger, WalletLedgerError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Description recorded on withdrawal debits.
pub const WITHDRAWAL_DESCRIPTION: &str = "withdrawal";

/// Service-level wallet errors.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    /// A wallet rule rejected the operation; no balance changed.
    #[error(transparent)]
    Domain(#[from] WalletDomainError),

    /// An idempotency key was replayed but its original posting is not a
    /// transfer.
    #[error("posting {0} is not a two-party transfer")]
    MismatchedReplay(IdempotencyKey),

    /// The backing store failed; the caller may retry.
    #[error("wallet store unavailable: {0}")]
    StoreUnavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl WalletError {
    /// Returns `true` for [`WalletDomainError::InsufficientFunds`].
    #[must_use]
    pub const fn is_insufficient_funds(&self) -> bool {
        matches!(
            self,
            Self::Domain(WalletDomainError::InsufficientFunds { .. })
        )
    }
}

impl From<WalletLedgerError> for WalletError {
    fn from(err: WalletLedgerError) -> Self {
        match err {
            WalletLedgerError::Rejected(domain) => Self::Domain(domain),
            WalletLedgerError::Persistence(source) => Self::StoreUnavailable(source),
        }
    }
}

/// Result type for wallet service operations.
pub type WalletResult<T> = Result<T, WalletError>;

/// Transaction ids produced by a two-party transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Debit entry on the sender's wallet.
    pub debit_transaction: TransactionId,
    /// Credit entry on the receiver's wallet.
    pub credit_transaction: TransactionId,
    /// `true` when the transfer had already been applied under the same
    /// idempotency key and no money moved on this call.
    pub replayed: bool,
}

impl TransferReceipt {
    fn from_posting(receipt: &PostingReceipt) -> Option<Self> {
        Some(Self {
            debit_transaction: receipt.transaction_of_kind(EntryKind::Debit)?,
            credit_transaction: receipt.transaction_of_kind(EntryKind::Credit)?,
            replayed: receipt.replayed,
        })
    }
}

/// Wallet store service. Leaf component: it calls nothing but its ledger.
#[derive(Clone)]
pub struct WalletService<L, C>
where
    L: WalletLedger,
    C: Clock + Send + Sync,
{
    ledger: Arc<L>,
    clock: Arc<C>,
}

impl<L, C> WalletService<L, C>
where
    L: WalletLedger,
    C: Clock + Send + Sync,
{
    /// Creates a wallet service.
    #[must_use]
    pub const fn new(ledger: Arc<L>, clock: Arc<C>) -> Self {
        Self { ledger, clock }
    }

    /// Returns the user's wallet, provisioning an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::StoreUnavailable`] when the ledger fails.
    pub async fn wallet(&self, user_id: &UserId) -> WalletResult<Wallet> {
        Ok(self.ledger.wallet(user_id, self.clock.utc()).await?)
    }

    /// Returns the user's current balance, provisioning a zero wallet on
    /// first access.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::StoreUnavailable`] when the ledger fails.
    pub async fn get_balance(&self, user_id: &UserId) -> WalletResult<Money> {
        Ok(self.wallet(user_id).await?.balance())
    }

    /// Adds `amount` to the user's wallet.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InvalidAmount`] unless `amount > 0`.
    pub async fn credit(
        &self,
        user_id: &UserId,
        amount: Money,
        description: &str,
        task_id: Option<TaskId>,
    ) -> WalletResult<TransactionId> {
        let posting = LedgerPosting::credit(user_id.clone(), amount, description, task_id)?;
        let transaction = self.post_single(&posting).await?;
        debug!(user = %user_id, %amount, %transaction, "wallet credited");
        Ok(transaction)
    }

    /// Removes `amount` from the user's wallet.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InvalidAmount`] unless `amount > 0` and
    /// [`WalletDomainError::InsufficientFunds`] when the balance is lower
    /// than `amount`; the balance is unchanged in both cases.
    pub async fn debit(
        &self,
        user_id: &UserId,
        amount: Money,
        description: &str,
        task_id: Option<TaskId>,
    ) -> WalletResult<TransactionId> {
        let posting = LedgerPosting::debit(user_id.clone(), amount, description, task_id)?;
        let transaction = self.post_single(&posting).await?;
        debug!(user = %user_id, %amount, %transaction, "wallet debited");
        Ok(transaction)
    }

    /// Moves `amount` from `from` to `to` for `task_id`, as one atomic
    /// posting producing one debit and one credit.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InsufficientFunds`] when the sender
    /// cannot cover the amount; neither wallet changes.
    pub async fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Money,
        task_id: TaskId,
    ) -> WalletResult<TransferReceipt> {
        let posting =
            LedgerPosting::transfer(from.clone(), to.clone(), amount, task_id, "transfer")?;
        self.post_transfer(&posting).await
    }

    /// Performs an exactly-once transfer under `key`.
    ///
    /// Replaying a key that was already posted returns the original receipt
    /// without checking balances again.
    ///
    /// # Errors
    ///
    /// As [`Self::transfer`], plus [`WalletError::MismatchedReplay`] when the
    /// key belongs to a posting that is not a transfer.
    pub async fn transfer_once(
        &self,
        key: IdempotencyKey,
        from: &UserId,
        to: &UserId,
        amount: Money,
        task_id: TaskId,
        memo: &str,
    ) -> WalletResult<TransferReceipt> {
        let posting = LedgerPosting::transfer(from.clone(), to.clone(), amount, task_id, memo)?
            .with_idempotency_key(key);
        self.post_transfer(&posting).await
    }

    /// Looks up a transfer previously made under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::StoreUnavailable`] when the ledger fails.
    pub async fn find_transfer(&self, key: &IdempotencyKey) -> WalletResult<Option<TransferReceipt>> {
        let receipt = self.ledger.find_posting(key).await?;
        receipt
            .map(|found| {
                TransferReceipt::from_posting(&found)
                    .ok_or_else(|| WalletError::MismatchedReplay(key.clone()))
            })
            .transpose()
    }

    /// Debits a payout request. Delivery to the payment processor happens
    /// outside this crate.
    ///
    /// # Errors
    ///
    /// As [`Self::debit`].
    pub async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: Money,
        payment_method: &PaymentMethodId,
    ) -> WalletResult<TransactionId> {
        let posting = LedgerPosting::debit(user_id.clone(), amount, WITHDRAWAL_DESCRIPTION, None)?;
        let transaction = self.post_single(&posting).await?;
        info!(
            user = %user_id,
            %amount,
            payment_method = %payment_method,
            %transaction,
            "withdrawal requested"
        );
        Ok(transaction)
    }

    /// Returns the user's ledger entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::StoreUnavailable`] when the ledger fails.
    pub async fn transactions_for_user(&self, user_id: &UserId) -> WalletResult<Vec<LedgerEntry>> {
        Ok(self.ledger.entries_for_user(user_id).await?)
    }

    /// Returns ledger entries tagged with `task_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::StoreUnavailable`] when the ledger fails.
    pub async fn transactions_for_task(&self, task_id: TaskId) -> WalletResult<Vec<LedgerEntry>> {
        Ok(self.ledger.entries_for_task(task_id).await?)
    }

    async fn post_single(&self, posting: &LedgerPosting) -> WalletResult<TransactionId> {
        let receipt = self.ledger.post(posting, self.clock.utc()).await?;
        receipt
            .first_transaction()
            .ok_or(WalletError::Domain(WalletDomainError::EmptyPosting))
    }

    async fn post_transfer(&self, posting: &LedgerPosting) -> WalletResult<TransferReceipt> {
        let receipt = self.ledger.post(posting, self.clock.utc()).await?;
        TransferReceipt::from_posting(&receipt).ok_or_else(|| {
            posting.idempotency_key().map_or(
                WalletError::Domain(WalletDomainError::EmptyPosting),
                |key| WalletError::MismatchedReplay(key.clone()),
            )
        })
    }
}
