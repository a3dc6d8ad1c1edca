//! In-memory integration tests for the marketplace engine.
//!
//! Tests are organised into modules by flow:
//! - `lifecycle_tests`: Posting, acceptance, progress, and live queries
//! - `settlement_tests`: Completion payments and reconciliation
//! - `cancellation_tests`: Cancellation counters and fees
//! - `chat_tests`: Thread binding across tasks
//! - `concurrency_tests`: Racing acceptances and completions

mod in_memory {
    pub mod helpers;

    mod cancellation_tests;
    mod chat_tests;
    mod concurrency_tests;
    mod lifecycle_tests;
    mod settlement_tests;
}
