//! Repository port for chat threads and their message logs.

use crate::chat::domain::{ChatMessage, ChatThread, ParticipantPair, ThreadId};
use crate::identity::UserId;
use crate::task::domain::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for chat repository operations.
pub type ChatRepositoryResult<T> = Result<T, ChatRepositoryError>;

/// Chat persistence contract.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Finds or creates the thread for `participants` as one idempotent
    /// upsert keyed by the pair. When `task_id` is given it becomes the
    /// thread's `last_task_id`.
    ///
    /// Concurrent calls for the same pair return the same thread.
    async fn upsert_thread(
        &self,
        participants: &ParticipantPair,
        task_id: Option<TaskId>,
        at: DateTime<Utc>,
    ) -> ChatRepositoryResult<ChatThread>;

    /// Finds a thread by identifier.
    async fn find_thread(&self, id: ThreadId) -> ChatRepositoryResult<Option<ChatThread>>;

    /// Appends a message and refreshes the thread summary atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ChatRepositoryError::ThreadNotFound`] when the thread does
    /// not exist.
    async fn append_message(&self, message: &ChatMessage) -> ChatRepositoryResult<ChatThread>;

    /// Returns a thread's messages, oldest first.
    async fn messages_in_thread(&self, id: ThreadId) -> ChatRepositoryResult<Vec<ChatMessage>>;

    /// Returns messages sent about `task_id`, oldest first.
    ///
    /// This is a projection of the thread logs, not a second copy.
    async fn messages_for_task(&self, task_id: TaskId) -> ChatRepositoryResult<Vec<ChatMessage>>;

    /// Returns the threads `user` takes part in, most recently active first.
    async fn threads_for_user(&self, user: &UserId) -> ChatRepositoryResult<Vec<ChatThread>>;
}

/// Errors returned by chat repository implementations.
#[derive(Debug, Clone, Error)]
pub enum ChatRepositoryError {
    /// The thread was not found.
    #[error("chat thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ChatRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
