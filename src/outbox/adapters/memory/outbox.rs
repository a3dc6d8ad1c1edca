//! In-memory outbox.

use crate::outbox::{
    domain::{OutboxEntry, OutboxEntryId},
    ports::{Outbox, OutboxError, OutboxResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory outbox. Entries are kept in enqueue order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOutbox {
    entries: Arc<RwLock<Vec<OutboxEntry>>>,
}

impl InMemoryOutbox {
    /// Creates an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> OutboxError {
    OutboxError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl Outbox for InMemoryOutbox {
    async fn enqueue(&self, entry: &OutboxEntry) -> OutboxResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        if entries.iter().all(|queued| queued.id != entry.id) {
            entries.push(entry.clone());
        }
        Ok(())
    }

    async fn pending(&self) -> OutboxResult<Vec<OutboxEntry>> {
        let entries = self.entries.read().map_err(lock_error)?;
        Ok(entries.clone())
    }

    async fn acknowledge(&self, id: OutboxEntryId) -> OutboxResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        entries.retain(|entry| entry.id != id);
        Ok(())
    }

    async fn record_failure(
        &self,
        id: OutboxEntryId,
        error: &str,
        at: DateTime<Utc>,
    ) -> OutboxResult<()> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        if let Some(entry) = entries.iter_mut().find(|entry| entry.id == id) {
            entry.record_failure(error, at);
        }
        Ok(())
    }
}
