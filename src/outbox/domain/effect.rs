//! The side effects that can be deferred.

use crate::identity::UserId;
use crate::notification::{domain::Notification, ports::PushMessage};
use crate::task::domain::TaskId;
use serde::{Deserialize, Serialize};

/// A side effect waiting to be replayed.
///
/// Serialized as a JSON object tagged by `effect`, which is the payload
/// stored by persistent outboxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PendingEffect {
    /// Write a notification to the recipient's inbox.
    StoreNotification {
        /// The notification to store.
        notification: Notification,
    },
    /// Hand a message to the push provider.
    PushNotification {
        /// The message to deliver.
        message: PushMessage,
    },
    /// Bind a task's two parties to their chat thread.
    BindChat {
        /// Task creator.
        creator: UserId,
        /// Accepted performer.
        performer: UserId,
        /// Task to record as the thread's latest.
        task_id: TaskId,
    },
}

impl PendingEffect {
    /// Returns the effect name used in logs and the `effect` column.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StoreNotification { .. } => "notification.store",
            Self::PushNotification { .. } => "notification.push",
            Self::BindChat { .. } => "chat.resolve",
        }
    }

    /// Encodes the effect as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when a field cannot be encoded.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Decodes an effect from a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error for unknown tags or missing fields.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload)
    }
}
