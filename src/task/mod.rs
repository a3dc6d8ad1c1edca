//! Task lifecycle: the task store, its progress log, and the orchestrator
//! that drives a task from `open` to a terminal state.
//!
//! Acceptance and status changes are conditional writes, so concurrent
//! callers cannot both win. Completion moves the price between wallets
//! exactly once before the terminal status is written. The module follows
//! the crate's hexagonal layout:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
