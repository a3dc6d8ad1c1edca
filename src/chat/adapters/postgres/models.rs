//! Diesel row models for chat persistence.

use super::schema::{chat_messages, chat_threads};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Thread row, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = chat_threads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ThreadRow {
    /// Thread identifier.
    pub id: uuid::Uuid,
    /// Smaller participant id.
    pub participant_low: String,
    /// Larger participant id.
    pub participant_high: String,
    /// Most recently bound task.
    pub last_task_id: Option<uuid::Uuid>,
    /// Latest message summary.
    pub last_message: Option<String>,
    /// Latest message time.
    pub last_message_time: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Message row for reads.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Message identifier.
    pub id: uuid::Uuid,
    /// Owning thread.
    pub thread_id: uuid::Uuid,
    /// Author.
    pub sender_id: String,
    /// Other participant.
    pub recipient_id: String,
    /// Text.
    pub content: String,
    /// Attachment reference.
    pub attachment: Option<String>,
    /// Related task.
    pub task_id: Option<uuid::Uuid>,
    /// Send time.
    pub created_at: DateTime<Utc>,
}

/// Insert model for messages.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewMessageRow {
    /// Message identifier.
    pub id: uuid::Uuid,
    /// Owning thread.
    pub thread_id: uuid::Uuid,
    /// Author.
    pub sender_id: String,
    /// Other participant.
    pub recipient_id: String,
    /// Text.
    pub content: String,
    /// Attachment reference.
    pub attachment: Option<String>,
    /// Related task.
    pub task_id: Option<uuid::Uuid>,
    /// Send time.
    pub created_at: DateTime<Utc>,
}
