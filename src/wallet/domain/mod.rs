//! Domain model for wallets and the transaction ledger.
//!
//! Balances only change through [`LedgerPosting`]s, and every applied leg
//! yields exactly one [`LedgerEntry`], so a wallet's balance always equals the
//! sum of its ledger amounts.

mod error;
mod ids;
mod ledger;
mod money;

pub use error::{ParseEntryKindError, WalletDomainError};
pub use ids::{IdempotencyKey, PaymentMethodId, TransactionId};
pub use ledger::{
    EntryKind, LedgerEntry, LedgerPosting, PostingLeg, PostingReceipt, Wallet, apply_posting,
};
pub use money::Money;
