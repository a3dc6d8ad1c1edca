//! Stored notifications.

use super::{NotificationDomainError, NotificationId, NotificationKind};
use crate::identity::UserId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message in a user's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// What the notification is about.
    pub kind: NotificationKind,
    /// Short title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Related task.
    pub task_id: Option<TaskId>,
    /// Whether the recipient has read it.
    pub read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Marks the notification read on behalf of `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationDomainError::NotRecipient`] unless `reader` is
    /// the recipient.
    pub fn mark_read(&mut self, reader: &UserId) -> Result<(), NotificationDomainError> {
        if self.user_id != *reader {
            return Err(NotificationDomainError::NotRecipient(self.id));
        }
        self.read = true;
        Ok(())
    }
}
