//! Domain model for deferred side effects.

mod effect;
mod entry;

pub use effect::PendingEffect;
pub use entry::{DeliveryStatus, OutboxEntry, OutboxEntryId, Redelivery};
