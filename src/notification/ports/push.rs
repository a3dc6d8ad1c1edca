//! Outbound push delivery port.

use crate::identity::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A message handed to the push provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Recipient.
    pub user_id: UserId,
    /// Short title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Provider-neutral key/value payload (`type`, `task_id`,
    /// `notification_id`).
    pub metadata: BTreeMap<String, String>,
}

/// Failure reported by a push provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("push delivery failed: {0}")]
pub struct PushError(pub String);

/// External push delivery collaborator.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Hands `message` to the provider.
    async fn deliver(&self, message: &PushMessage) -> Result<(), PushError>;
}
