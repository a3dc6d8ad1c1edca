//! Step definitions for marketplace settlement scenarios.

mod given;
mod then;
mod when;
pub mod world;
