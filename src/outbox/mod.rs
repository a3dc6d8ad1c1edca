//! Durable record of side effects whose retries ran out.
//!
//! Notification storage, push delivery, and chat binding run after a task
//! commit. When their retry budget is spent the effect is written here
//! instead of being dropped, and a later `redeliver_pending` drain replays
//! it once the collaborator recovers. Delivery is at least once.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
