//! Wallet balances, ledger entries, and atomic postings.

use super::{IdempotencyKey, Money, ParseEntryKindError, TransactionId, WalletDomainError};
use crate::identity::UserId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Money added to a wallet.
    Credit,
    /// Money removed from a wallet.
    Debit,
}

impl EntryKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Returns the signed form of a positive amount for this direction.
    #[must_use]
    pub const fn signed(self, amount: Money) -> Money {
        match self {
            Self::Credit => amount,
            Self::Debit => amount.negated(),
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = ParseEntryKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            _ => Err(ParseEntryKindError(value.to_owned())),
        }
    }
}

/// Per-user balance. Exactly one exists per user, provisioned lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    user_id: UserId,
    balance: Money,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Creates an empty wallet for `user_id`.
    #[must_use]
    pub const fn provision(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: Money::ZERO,
            updated_at: at,
        }
    }

    /// Reconstructs a wallet from persisted storage.
    #[must_use]
    pub const fn from_persisted(user_id: UserId, balance: Money, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance,
            updated_at,
        }
    }

    /// Returns the owner.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the current balance.
    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance
    }

    /// Returns the time of the last balance change or provisioning.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies one leg to the balance.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InsufficientFunds`] when a debit exceeds
    /// the balance, leaving the wallet unchanged.
    pub fn apply(&mut self, leg: &PostingLeg, at: DateTime<Utc>) -> Result<(), WalletDomainError> {
        if leg.kind == EntryKind::Debit && self.balance < leg.amount {
            return Err(WalletDomainError::InsufficientFunds {
                user_id: self.user_id.clone(),
                balance: self.balance,
                requested: leg.amount,
            });
        }
        self.balance = self
            .balance
            .checked_add(leg.kind.signed(leg.amount))
            .ok_or_else(|| WalletDomainError::BalanceOverflow(self.user_id.clone()))?;
        self.updated_at = at;
        Ok(())
    }
}

/// Immutable record of a single signed balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Transaction identifier.
    pub id: TransactionId,
    /// Wallet owner affected by the change.
    pub user_id: UserId,
    /// Task the money movement relates to, if any.
    pub task_id: Option<TaskId>,
    /// Signed amount: positive for credits, negative for debits.
    pub amount: Money,
    /// Direction of the change.
    pub kind: EntryKind,
    /// Human-readable description.
    pub description: String,
    /// Time the entry was written.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Materialises the ledger record for an applied leg.
    #[must_use]
    pub fn from_leg(leg: &PostingLeg, at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            user_id: leg.user_id.clone(),
            task_id: leg.task_id,
            amount: leg.kind.signed(leg.amount),
            kind: leg.kind,
            description: leg.description.clone(),
            created_at: at,
        }
    }
}

/// One side of a posting: a positive amount moved in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingLeg {
    /// Wallet owner.
    pub user_id: UserId,
    /// Related task, if any.
    pub task_id: Option<TaskId>,
    /// Direction of the movement.
    pub kind: EntryKind,
    /// Strictly positive magnitude.
    pub amount: Money,
    /// Human-readable description.
    pub description: String,
}

/// Set of legs applied all-or-nothing, each producing one ledger entry.
///
/// Legs are applied in order, so a transfer lists the debit first and the
/// credit is only applied once the sender is known to be covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerPosting {
    idempotency_key: Option<IdempotencyKey>,
    legs: Vec<PostingLeg>,
}

impl LedgerPosting {
    /// Builds a single-leg credit.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InvalidAmount`] unless `amount > 0`.
    pub fn credit(
        user_id: UserId,
        amount: Money,
        description: impl Into<String>,
        task_id: Option<TaskId>,
    ) -> Result<Self, WalletDomainError> {
        Ok(Self::single(leg(user_id, EntryKind::Credit, amount, description, task_id)?))
    }

    /// Builds a single-leg debit.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InvalidAmount`] unless `amount > 0`.
    pub fn debit(
        user_id: UserId,
        amount: Money,
        description: impl Into<String>,
        task_id: Option<TaskId>,
    ) -> Result<Self, WalletDomainError> {
        Ok(Self::single(leg(user_id, EntryKind::Debit, amount, description, task_id)?))
    }

    /// Builds a two-leg transfer: debit `from`, then credit `to`, both tagged
    /// with `task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WalletDomainError::InvalidAmount`] unless `amount > 0`.
    pub fn transfer(
        from: UserId,
        to: UserId,
        amount: Money,
        task_id: TaskId,
        memo: &str,
    ) -> Result<Self, WalletDomainError> {
        let debit = leg(
            from.clone(),
            EntryKind::Debit,
            amount,
            format!("{memo} to {to}"),
            Some(task_id),
        )?;
        let credit = leg(
            to,
            EntryKind::Credit,
            amount,
            format!("{memo} from {from}"),
            Some(task_id),
        )?;
        Ok(Self {
            idempotency_key: None,
            legs: vec![debit, credit],
        })
    }

    /// Makes the posting exactly-once under `key`.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: IdempotencyKey) -> Self {
        self.idempotency_key = Some(key);
        self
    }

    /// Returns the idempotency key, if any.
    #[must_use]
    pub const fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        self.idempotency_key.as_ref()
    }

    /// Returns the legs in application order.
    #[must_use]
    pub fn legs(&self) -> &[PostingLeg] {
        &self.legs
    }

    /// Returns every wallet owner touched by the posting, sorted and
    /// deduplicated so adapters can lock wallets in a stable order.
    #[must_use]
    pub fn participants(&self) -> Vec<UserId> {
        self.legs
            .iter()
            .map(|posting_leg| posting_leg.user_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn single(posting_leg: PostingLeg) -> Self {
        Self {
            idempotency_key: None,
            legs: vec![posting_leg],
        }
    }
}

/// Applies every leg to `wallets` in order, producing the ledger entries.
///
/// `wallets` must contain a wallet for each participant. On error nothing in
/// `wallets` should be persisted; callers work on copies and discard them.
///
/// # Errors
///
/// Returns the first [`WalletDomainError`] raised by a leg, or
/// [`WalletDomainError::EmptyPosting`] when the posting has no legs.
pub fn apply_posting(
    posting: &LedgerPosting,
    wallets: &mut [Wallet],
    at: DateTime<Utc>,
) -> Result<Vec<LedgerEntry>, WalletDomainError> {
    if posting.legs.is_empty() {
        return Err(WalletDomainError::EmptyPosting);
    }
    let mut entries = Vec::with_capacity(posting.legs.len());
    for posting_leg in &posting.legs {
        let wallet = wallets
            .iter_mut()
            .find(|wallet| wallet.user_id == posting_leg.user_id)
            .ok_or_else(|| WalletDomainError::InsufficientFunds {
                user_id: posting_leg.user_id.clone(),
                balance: Money::ZERO,
                requested: posting_leg.amount,
            })?;
        wallet.apply(posting_leg, at)?;
        entries.push(LedgerEntry::from_leg(posting_leg, at));
    }
    Ok(entries)
}

/// Outcome of a posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingReceipt {
    /// Entries written by the posting, in leg order.
    pub entries: Vec<LedgerEntry>,
    /// `true` when the idempotency key had already been posted and no money
    /// moved on this call.
    pub replayed: bool,
}

impl PostingReceipt {
    /// Returns the transaction id of the first entry.
    #[must_use]
    pub fn first_transaction(&self) -> Option<TransactionId> {
        self.entries.first().map(|entry| entry.id)
    }

    /// Returns the id of the first entry of the given kind.
    #[must_use]
    pub fn transaction_of_kind(&self, kind: EntryKind) -> Option<TransactionId> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.id)
    }
}

fn leg(
    user_id: UserId,
    kind: EntryKind,
    amount: Money,
    description: impl Into<String>,
    task_id: Option<TaskId>,
) -> Result<PostingLeg, WalletDomainError> {
    if !amount.is_positive() {
        return Err(WalletDomainError::InvalidAmount(amount));
    }
    Ok(PostingLeg {
        user_id,
        task_id,
        kind,
        amount,
        description: description.into(),
    })
}
