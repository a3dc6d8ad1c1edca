//! Error types for wallet rules and parsing.

use super::Money;
use crate::identity::UserId;
use thiserror::Error;

/// Rule violations raised while building or applying ledger postings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletDomainError {
    /// Credits, debits, and transfers require a strictly positive amount.
    #[error("amount {0} must be greater than zero")]
    InvalidAmount(Money),

    /// The wallet cannot cover the requested debit.
    #[error("insufficient funds in wallet of {user_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// Owner of the wallet that would be overdrawn.
        user_id: UserId,
        /// Balance at the time of the attempt.
        balance: Money,
        /// Amount the posting tried to debit.
        requested: Money,
    },

    /// Applying the amount would overflow the balance representation.
    #[error("balance overflow in wallet of {0}")]
    BalanceOverflow(UserId),

    /// A posting must move money through at least one wallet.
    #[error("ledger posting has no legs")]
    EmptyPosting,
}

/// Error returned while parsing a persisted entry kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown ledger entry kind: {0}")]
pub struct ParseEntryKindError(pub String);
