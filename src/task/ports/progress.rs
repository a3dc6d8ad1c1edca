//! Progress log port.

use super::TaskRepositoryResult;
use crate::live::Subscription;
use crate::task::domain::{ProgressEntry, ProgressEntryId, TaskId};
use async_trait::async_trait;

/// Append-only per-task status history.
///
/// The log records what it is given; transition legality is checked before
/// entries reach it.
#[async_trait]
pub trait ProgressLog: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: &ProgressEntry) -> TaskRepositoryResult<ProgressEntryId>;

    /// Returns every entry for `task_id`, oldest first.
    async fn list_for(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<ProgressEntry>>;

    /// Opens a live query over the entries for `task_id`.
    async fn subscribe(
        &self,
        task_id: TaskId,
    ) -> TaskRepositoryResult<Subscription<ProgressEntry>>;
}
