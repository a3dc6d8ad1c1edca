//! Two-party chat: one canonical thread per unordered pair of users.
//!
//! Threads are found or created through an idempotent upsert keyed by the
//! sorted participant pair. Messages live in one log per thread; the
//! per-task view is a filter over that log.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
