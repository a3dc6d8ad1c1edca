//! Storage port for deferred side effects.

use crate::outbox::domain::{OutboxEntry, OutboxEntryId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;

/// Durable queue of deferred side effects.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Stores a new entry. Enqueuing an id twice keeps the first entry.
    async fn enqueue(&self, entry: &OutboxEntry) -> OutboxResult<()>;

    /// Returns every queued entry, oldest first.
    async fn pending(&self) -> OutboxResult<Vec<OutboxEntry>>;

    /// Removes a replayed entry. Unknown ids are ignored, so two drains
    /// acknowledging the same entry both succeed.
    async fn acknowledge(&self, id: OutboxEntryId) -> OutboxResult<()>;

    /// Bumps the attempt count and stores the latest error. Unknown ids
    /// are ignored.
    async fn record_failure(
        &self,
        id: OutboxEntryId,
        error: &str,
        at: DateTime<Utc>,
    ) -> OutboxResult<()>;
}

/// Errors returned by outbox implementations.
#[derive(Debug, Clone, Error)]
pub enum OutboxError {
    /// A stored payload no longer decodes into an effect.
    #[error("outbox entry {id} has an unreadable payload: {source}")]
    Payload {
        /// Offending entry.
        id: OutboxEntryId,
        /// Decoder failure.
        source: Arc<serde_json::Error>,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl OutboxError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
