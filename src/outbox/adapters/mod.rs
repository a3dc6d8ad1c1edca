//! Adapter implementations for the outbox port.

pub mod memory;
pub mod postgres;
