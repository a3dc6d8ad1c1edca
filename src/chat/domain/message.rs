//! Chat messages.

use super::{MessageId, ThreadId};
use crate::identity::UserId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary text used for attachment-only messages.
pub const ATTACHMENT_SUMMARY: &str = "[attachment]";

/// One message in a thread's canonical log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Owning thread.
    pub thread_id: ThreadId,
    /// Author.
    pub sender_id: UserId,
    /// Other participant.
    pub recipient_id: UserId,
    /// Message text, possibly empty when an attachment is present.
    pub content: String,
    /// Opaque reference to uploaded media.
    pub attachment: Option<String>,
    /// Task the message was sent about, if any.
    pub task_id: Option<TaskId>,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Returns the text shown as the thread's last message.
    #[must_use]
    pub fn summary(&self) -> &str {
        if self.content.is_empty() {
            ATTACHMENT_SUMMARY
        } else {
            &self.content
        }
    }
}
