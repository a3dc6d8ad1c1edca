//! Adapter implementations for chat ports.

pub mod memory;
pub mod postgres;
