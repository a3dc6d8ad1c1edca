//! In-memory outbox for tests and embedded use.

mod outbox;

pub use outbox::InMemoryOutbox;
