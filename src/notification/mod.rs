//! Notification fan-out: a persisted inbox per user plus push delivery.
//!
//! Notifications are side effects of task and wallet changes. Emitting one
//! never fails the change that triggered it.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
