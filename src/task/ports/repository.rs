//! Repository port for task persistence, conditional transitions, and live
//! queries.

use crate::identity::UserId;
use crate::live::Subscription;
use crate::task::domain::{ProgressEntry, Task, TaskFilter, TaskId, TaskStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Precondition a conditional write checks against the stored task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGuard {
    /// Status the task must still have.
    pub status: TaskStatus,
    /// Performer the task must still have.
    pub accepted_by: Option<UserId>,
}

impl TaskGuard {
    /// Captures the guard fields of a task as it was loaded.
    #[must_use]
    pub fn observed(task: &Task) -> Self {
        Self {
            status: task.status(),
            accepted_by: task.accepted_by().cloned(),
        }
    }

    /// Returns `true` when `task` still satisfies the guard.
    #[must_use]
    pub fn holds_for(&self, task: &Task) -> bool {
        task.status() == self.status && task.accepted_by() == self.accepted_by.as_ref()
    }
}

/// A status change written as one atomic unit.
///
/// The task row, the progress entry, and any requested counter increment
/// (cancellations by the actor, completions by the performer) are
/// committed together or not at all.
#[derive(Debug, Clone)]
pub struct TaskTransition {
    /// Task state after the transition.
    pub task: Task,
    /// Precondition on the stored task.
    pub expected: TaskGuard,
    /// Progress entry recording the change.
    pub progress: ProgressEntry,
    /// User whose cancellation counter is incremented, if any.
    pub count_cancellation_for: Option<UserId>,
    /// Performer whose completion counter is incremented, if any.
    pub count_completion_for: Option<UserId>,
}

/// Result of a committed transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionReceipt {
    /// Cancellation counter after the increment, when one was requested.
    pub cancellation_count: Option<u32>,
    /// Completion counter after the increment, when one was requested.
    pub completion_count: Option<u64>,
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Replaces the descriptive fields of a task when `expected` still
    /// holds. Status and parties are left as stored.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown tasks and
    /// [`TaskRepositoryError::Conflict`] when the guard no longer holds.
    async fn update_details(&self, task: &Task, expected: &TaskGuard) -> TaskRepositoryResult<()>;

    /// Commits a status change conditionally.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] for unknown tasks and
    /// [`TaskRepositoryError::Conflict`] carrying the stored task when the
    /// guard no longer holds. Nothing is written in either case.
    async fn commit_transition(
        &self,
        transition: &TaskTransition,
    ) -> TaskRepositoryResult<TransitionReceipt>;

    /// Returns tasks matching `filter`, newest first.
    async fn query(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Opens a live query over tasks matching `filter`.
    async fn subscribe(&self, filter: TaskFilter) -> TaskRepositoryResult<Subscription<Task>>;

    /// Returns how many tasks `user` has cancelled.
    async fn cancellation_count(&self, user: &UserId) -> TaskRepositoryResult<u32>;

    /// Returns how many tasks `user` has completed as performer, as counted
    /// by committed completion transitions.
    async fn count_completed_by(&self, user: &UserId) -> TaskRepositoryResult<u64>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The stored task no longer matched the write's precondition.
    #[error("task {task_id} changed concurrently; now {}", current.status())]
    Conflict {
        /// Task that was targeted.
        task_id: TaskId,
        /// Stored state at the time of the failed write.
        current: Box<Task>,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
