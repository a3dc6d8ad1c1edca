//! Wallet store: per-user balances and the append-only transaction ledger.
//!
//! Every balance change is paired with exactly one ledger entry written in
//! the same atomic unit; a transfer writes one debit and one credit. The
//! module follows the same hexagonal split as the rest of the crate:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
