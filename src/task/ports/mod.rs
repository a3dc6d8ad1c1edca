//! Port contracts for the task lifecycle.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod progress;
pub mod repository;

pub use progress::ProgressLog;
pub use repository::{
    TaskGuard, TaskRepository, TaskRepositoryError, TaskRepositoryResult, TaskTransition,
    TransitionReceipt,
};
