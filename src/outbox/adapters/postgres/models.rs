//! Diesel row models for the outbox.

use super::schema::outbox_entries;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Outbox row, used for reads and inserts. `seq` is assigned by the
/// database.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = outbox_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxRow {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Effect name.
    pub effect: String,
    /// Tagged JSON encoding of the effect.
    pub payload: serde_json::Value,
    /// Attempts made so far.
    pub attempts: i32,
    /// Error from the most recent attempt.
    pub last_error: String,
    /// When the effect was first deferred.
    pub enqueued_at: DateTime<Utc>,
    /// When the entry last changed.
    pub updated_at: DateTime<Utc>,
}
