//! Adapter implementations for wallet ports.

pub mod memory;
pub mod postgres;
