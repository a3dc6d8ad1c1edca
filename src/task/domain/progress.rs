//! Append-only progress log entries.

use super::{ProgressEntryId, TaskId, TaskStatus};
use crate::identity::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One status change recorded against a task.
///
/// Entries are never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Entry identifier.
    pub id: ProgressEntryId,
    /// Task the entry belongs to.
    pub task_id: TaskId,
    /// Status the task moved to.
    pub status: TaskStatus,
    /// Optional note supplied by the actor.
    pub notes: Option<String>,
    /// User who caused the change.
    pub actor_id: UserId,
    /// When the change was recorded.
    pub created_at: DateTime<Utc>,
}

impl ProgressEntry {
    /// Records `actor` moving `task_id` to `status` at `created_at`.
    ///
    /// Blank notes are stored as `None`.
    #[must_use]
    pub fn record(
        task_id: TaskId,
        status: TaskStatus,
        actor: UserId,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let notes = notes
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        Self {
            id: ProgressEntryId::new(),
            task_id,
            status,
            notes,
            actor_id: actor,
            created_at,
        }
    }
}
