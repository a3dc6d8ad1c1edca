//! Error types for task lifecycle rules and parsing.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Guard violations raised by the task aggregate.
///
/// Every variant is raised before any field changes, so a rejected
/// operation leaves the task untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The price is below zero.
    #[error("task price must not be negative")]
    NegativePrice,

    /// The creator tried to accept their own task.
    #[error("task {0} cannot be accepted by its creator")]
    SelfAcceptance(TaskId),

    /// The task is no longer open.
    #[error("task {task_id} is already {status}")]
    AlreadyAccepted {
        /// Task that was targeted.
        task_id: TaskId,
        /// Status observed at the time of the attempt.
        status: TaskStatus,
    },

    /// Only the performer may advance a task.
    #[error("only the performer may update task {0}")]
    NotPerformer(TaskId),

    /// Only the creator or performer may cancel or edit a task.
    #[error("actor is not a party to task {0}")]
    NotParticipant(TaskId),

    /// The requested status is not reachable from the current one.
    #[error("invalid task transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// A cancellation needs a non-empty reason.
    #[error("a cancellation reason is required")]
    MissingReason,
}

/// Error returned while parsing task statuses from persistence or input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
