//! Unit tests for the task module.
//!
//! Domain rules are exercised directly on the aggregate; service tests run
//! the orchestrator against the in-memory adapters.

mod redelivery_tests;
mod support;
