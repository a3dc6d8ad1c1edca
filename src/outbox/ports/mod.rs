//! Port contracts for the outbox.

pub mod outbox;

pub use outbox::{Outbox, OutboxError, OutboxResult};
