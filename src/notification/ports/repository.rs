//! Notification inbox port.

use crate::identity::UserId;
use crate::notification::domain::{Notification, NotificationId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification repository operations.
pub type NotificationRepositoryResult<T> = Result<T, NotificationRepositoryError>;

/// Notification persistence contract.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Stores a new notification. Storing the same id twice is a no-op.
    async fn store(&self, notification: &Notification) -> NotificationRepositoryResult<()>;

    /// Finds a notification by identifier.
    async fn find(&self, id: NotificationId) -> NotificationRepositoryResult<Option<Notification>>;

    /// Returns a user's notifications, newest first.
    async fn list_for_user(&self, user: &UserId) -> NotificationRepositoryResult<Vec<Notification>>;

    /// Sets the read flag.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationRepositoryError::NotFound`] for unknown ids.
    async fn mark_read(&self, id: NotificationId) -> NotificationRepositoryResult<()>;
}

/// Errors returned by notification repository implementations.
#[derive(Debug, Clone, Error)]
pub enum NotificationRepositoryError {
    /// The notification was not found.
    #[error("notification not found: {0}")]
    NotFound(NotificationId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
