//! Diesel row models for task persistence.

use super::schema::{cancellation_counters, completion_counters, task_progress, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Task row, used for reads and inserts.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Listing category.
    pub category: String,
    /// Location text.
    pub location: String,
    /// Price in cents.
    pub price_cents: i64,
    /// Effort estimate.
    pub estimated_time: Option<String>,
    /// Creator.
    pub created_by: String,
    /// Performer.
    pub accepted_by: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Cancellation timestamp.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Cancellation reason.
    pub cancellation_reason: Option<String>,
}

/// Mutable columns written by a conditional transition.
///
/// `None` clears the column rather than skipping it.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskTransitionChangeset {
    /// Performer.
    pub accepted_by: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Cancellation timestamp.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Cancellation reason.
    pub cancellation_reason: Option<String>,
}

/// Descriptive columns written by a details edit.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskDetailsChangeset {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Listing category.
    pub category: String,
    /// Location text.
    pub location: String,
    /// Price in cents.
    pub price_cents: i64,
    /// Effort estimate.
    pub estimated_time: Option<String>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for progress entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProgressRow {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Status reached.
    pub status: String,
    /// Optional note.
    pub notes: Option<String>,
    /// Actor.
    pub actor_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for progress entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_progress)]
pub struct NewProgressRow {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Owning task.
    pub task_id: uuid::Uuid,
    /// Status reached.
    pub status: String,
    /// Optional note.
    pub notes: Option<String>,
    /// Actor.
    pub actor_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for a first cancellation.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cancellation_counters)]
pub struct NewCounterRow {
    /// Counted user.
    pub user_id: String,
    /// Initial count.
    pub count: i32,
    /// Increment timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for a performer's first completion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = completion_counters)]
pub struct NewCompletionCounterRow {
    /// Performer.
    pub user_id: String,
    /// Initial count.
    pub count: i64,
    /// Increment timestamp.
    pub updated_at: DateTime<Utc>,
}
