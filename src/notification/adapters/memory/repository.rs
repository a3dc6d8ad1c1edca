//! In-memory notification inbox.

use crate::identity::UserId;
use crate::notification::{
    domain::{Notification, NotificationId},
    ports::{NotificationRepository, NotificationRepositoryError, NotificationRepositoryResult},
};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory notification inbox.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationRepository {
    /// Creates an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> NotificationRepositoryError {
    NotificationRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn store(&self, notification: &Notification) -> NotificationRepositoryResult<()> {
        let mut notifications = self.notifications.write().map_err(lock_error)?;
        if notifications.iter().all(|stored| stored.id != notification.id) {
            notifications.push(notification.clone());
        }
        Ok(())
    }

    async fn find(&self, id: NotificationId) -> NotificationRepositoryResult<Option<Notification>> {
        let notifications = self.notifications.read().map_err(lock_error)?;
        Ok(notifications.iter().find(|stored| stored.id == id).cloned())
    }

    async fn list_for_user(&self, user: &UserId) -> NotificationRepositoryResult<Vec<Notification>> {
        let notifications = self.notifications.read().map_err(lock_error)?;
        Ok(notifications
            .iter()
            .rev()
            .filter(|stored| stored.user_id == *user)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: NotificationId) -> NotificationRepositoryResult<()> {
        let mut notifications = self.notifications.write().map_err(lock_error)?;
        let stored = notifications
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or(NotificationRepositoryError::NotFound(id))?;
        stored.read = true;
        Ok(())
    }
}
