//! Port contracts for wallet persistence.

pub mod ledger;

pub use ledger::{WalletLedger, WalletLedgerError, WalletLedgerResult};
