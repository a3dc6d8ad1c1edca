//! In-memory wallet adapters for tests and embedded use.

mod ledger;

pub use ledger::InMemoryWalletLedger;
