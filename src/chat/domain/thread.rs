//! Chat thread aggregate.

use super::{ChatMessage, ParticipantPair, ThreadId};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single conversation between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    id: ThreadId,
    participants: ParticipantPair,
    last_task_id: Option<TaskId>,
    last_message: Option<String>,
    last_message_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedThreadData {
    /// Thread identifier.
    pub id: ThreadId,
    /// Canonical participant pair.
    pub participants: ParticipantPair,
    /// Most recent task bound to the thread.
    pub last_task_id: Option<TaskId>,
    /// Summary of the latest message.
    pub last_message: Option<String>,
    /// Time of the latest message.
    pub last_message_time: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ChatThread {
    /// Opens a new thread for `participants`.
    #[must_use]
    pub fn open(participants: ParticipantPair, task_id: Option<TaskId>, at: DateTime<Utc>) -> Self {
        Self {
            id: ThreadId::new(),
            participants,
            last_task_id: task_id,
            last_message: None,
            last_message_time: None,
            created_at: at,
            updated_at: at,
        }
    }

    /// Reconstructs a thread from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedThreadData) -> Self {
        Self {
            id: data.id,
            participants: data.participants,
            last_task_id: data.last_task_id,
            last_message: data.last_message,
            last_message_time: data.last_message_time,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the thread identifier.
    #[must_use]
    pub const fn id(&self) -> ThreadId {
        self.id
    }

    /// Returns the participant pair.
    #[must_use]
    pub const fn participants(&self) -> &ParticipantPair {
        &self.participants
    }

    /// Returns the most recently bound task.
    #[must_use]
    pub const fn last_task_id(&self) -> Option<TaskId> {
        self.last_task_id
    }

    /// Returns the latest message summary.
    #[must_use]
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Returns the latest message time.
    #[must_use]
    pub const fn last_message_time(&self) -> Option<DateTime<Utc>> {
        self.last_message_time
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Points the thread at a newer task between the same pair.
    pub fn bind_task(&mut self, task_id: TaskId, at: DateTime<Utc>) {
        self.last_task_id = Some(task_id);
        self.updated_at = at;
    }

    /// Updates the last-message summary from `message`.
    pub fn record_message(&mut self, message: &ChatMessage) {
        self.last_message = Some(message.summary().to_owned());
        self.last_message_time = Some(message.created_at);
        self.updated_at = message.created_at;
    }
}
