//! Unit tests for the outbox module.

mod outbox_tests;
