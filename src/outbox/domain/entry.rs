//! Outbox entries and drain reports.

use super::PendingEffect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutboxEntryId(Uuid);

impl OutboxEntryId {
    /// Creates a new random entry identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entry identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for OutboxEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutboxEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deferred side effect and its delivery history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    /// Entry identifier.
    pub id: OutboxEntryId,
    /// What to replay.
    pub effect: PendingEffect,
    /// Attempts made so far, including the inline retries.
    pub attempts: u32,
    /// Error from the most recent attempt.
    pub last_error: String,
    /// When the effect was first deferred.
    pub enqueued_at: DateTime<Utc>,
    /// When the entry last changed.
    pub updated_at: DateTime<Utc>,
}

impl OutboxEntry {
    /// Creates an entry for an effect that failed `attempts` times.
    #[must_use]
    pub fn defer(
        effect: PendingEffect,
        attempts: u32,
        error: impl fmt::Display,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OutboxEntryId::new(),
            effect,
            attempts,
            last_error: error.to_string(),
            enqueued_at: at,
            updated_at: at,
        }
    }

    /// Records one more failed replay.
    pub fn record_failure(&mut self, error: &str, at: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        error.clone_into(&mut self.last_error);
        self.updated_at = at;
    }
}

/// How a side effect ended up after its inline retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The collaborator accepted the effect.
    Delivered,
    /// Retries ran out; the effect waits in the outbox.
    Deferred(OutboxEntryId),
    /// Retries ran out and the outbox write failed too.
    Dropped,
}

impl DeliveryStatus {
    /// Returns `true` once the collaborator has accepted the effect.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Outcome of one drain over the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Redelivery {
    /// Entries replayed successfully and removed.
    pub delivered: usize,
    /// Entries that failed again and remain queued.
    pub still_pending: usize,
}
