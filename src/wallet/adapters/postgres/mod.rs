//! `PostgreSQL` adapters for wallet persistence.

mod ledger;
mod models;
mod schema;

pub use ledger::PostgresWalletLedger;
