//! Push gateway that records deliveries instead of sending them.

use crate::notification::ports::{PushError, PushGateway, PushMessage};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Push gateway for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingPushGateway {
    delivered: Arc<Mutex<Vec<PushMessage>>>,
}

impl RecordingPushGateway {
    /// Creates a gateway with no recorded deliveries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message delivered so far, oldest first.
    #[must_use]
    pub fn delivered(&self) -> Vec<PushMessage> {
        self.delivered
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushGateway for RecordingPushGateway {
    async fn deliver(&self, message: &PushMessage) -> Result<(), PushError> {
        let mut delivered = self
            .delivered
            .lock()
            .map_err(|err| PushError(err.to_string()))?;
        delivered.push(message.clone());
        Ok(())
    }
}
