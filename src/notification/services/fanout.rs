//! Best-effort notification fan-out and the recipient's inbox.

use crate::config::RetryPolicy;
use crate::identity::UserId;
use crate::notification::{
    domain::{
        CopyContext, Notification, NotificationDomainError, NotificationId, NotificationKind,
        RenderedCopy,
    },
    ports::{NotificationRepository, NotificationRepositoryError, PushGateway, PushMessage},
};
use crate::outbox::{
    adapters::memory::InMemoryOutbox,
    domain::{DeliveryStatus, PendingEffect, Redelivery},
    ports::{Outbox, OutboxResult},
    services::{defer, settle},
};
use crate::retry::retry_side_effect;
use crate::task::domain::TaskId;
use mockable::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Errors from inbox operations. [`NotificationFanout::notify`] never fails.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// A notification rule rejected the request.
    #[error(transparent)]
    Domain(#[from] NotificationDomainError),

    /// The notification does not exist.
    #[error("notification not found: {0}")]
    NotFound(NotificationId),

    /// The backing store failed; the caller may retry.
    #[error("notification store unavailable: {0}")]
    StoreUnavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl From<NotificationRepositoryError> for NotificationError {
    fn from(err: NotificationRepositoryError) -> Self {
        match err {
            NotificationRepositoryError::NotFound(id) => Self::NotFound(id),
            NotificationRepositoryError::Persistence(source) => Self::StoreUnavailable(source),
        }
    }
}

/// Result type for inbox operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// A notification to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Recipient.
    pub recipient: UserId,
    /// What the notification is about.
    pub kind: NotificationKind,
    /// Template values.
    pub context: CopyContext,
    /// Related task.
    pub task_id: Option<TaskId>,
}

impl NotificationRequest {
    /// Creates a request about `task_id`.
    #[must_use]
    pub const fn about_task(
        recipient: UserId,
        kind: NotificationKind,
        context: CopyContext,
        task_id: TaskId,
    ) -> Self {
        Self {
            recipient,
            kind,
            context,
            task_id: Some(task_id),
        }
    }
}

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationReceipt {
    /// Identifier of the notification.
    pub id: NotificationId,
    /// Outcome of the inbox write.
    pub stored: DeliveryStatus,
    /// Outcome of the push.
    pub pushed: DeliveryStatus,
}

/// Stores notifications and pushes them to recipients.
///
/// Both steps are retried under the configured [`RetryPolicy`]. A step
/// whose retries run out is written to the outbox and replayed by
/// [`NotificationFanout::redeliver_pending`]; failures never reach the
/// caller.
#[derive(Clone)]
pub struct NotificationFanout<N, P, C, O = InMemoryOutbox>
where
    N: NotificationRepository,
    P: PushGateway,
    C: Clock + Send + Sync,
    O: Outbox,
{
    repository: Arc<N>,
    gateway: Arc<P>,
    clock: Arc<C>,
    outbox: Arc<O>,
    retry: RetryPolicy,
}

impl<N, P, C> NotificationFanout<N, P, C>
where
    N: NotificationRepository,
    P: PushGateway,
    C: Clock + Send + Sync,
{
    /// Creates a fan-out with the default retry policy and an in-memory
    /// outbox.
    #[must_use]
    pub fn new(repository: Arc<N>, gateway: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            repository,
            gateway,
            clock,
            outbox: Arc::new(InMemoryOutbox::new()),
            retry: RetryPolicy::default(),
        }
    }
}

impl<N, P, C, O> NotificationFanout<N, P, C, O>
where
    N: NotificationRepository,
    P: PushGateway,
    C: Clock + Send + Sync,
    O: Outbox,
{
    /// Replaces the outbox that exhausted effects are written to.
    #[must_use]
    pub fn with_outbox<Q: Outbox>(self, outbox: Arc<Q>) -> NotificationFanout<N, P, C, Q> {
        NotificationFanout {
            repository: self.repository,
            gateway: self.gateway,
            clock: self.clock,
            outbox,
            retry: self.retry,
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the outbox shared with other post-commit effects.
    #[must_use]
    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    /// Creates and delivers one notification.
    ///
    /// The receipt reports, per step, whether the effect was delivered or
    /// deferred to the outbox.
    pub async fn notify(&self, request: NotificationRequest) -> NotificationReceipt {
        let NotificationRequest {
            recipient,
            kind,
            context,
            task_id,
        } = request;
        let RenderedCopy { title, content } = kind.render(&context).unwrap_or_else(|err| {
            error!(kind = %kind, error = %err, "notification copy failed to render");
            RenderedCopy {
                title: kind.as_str().to_owned(),
                content: context.task_title.clone(),
            }
        });
        let notification = Notification {
            id: NotificationId::new(),
            user_id: recipient,
            kind,
            title,
            content,
            task_id,
            read: false,
            created_at: self.clock.utc(),
        };

        let store_result = retry_side_effect("notification.store", self.retry, || {
            self.repository.store(&notification)
        })
        .await;
        let stored = match store_result {
            Ok(()) => DeliveryStatus::Delivered,
            Err(exhausted) => {
                let effect = PendingEffect::StoreNotification {
                    notification: notification.clone(),
                };
                defer(&*self.outbox, effect, exhausted.attempts, &exhausted, self.clock.utc()).await
            }
        };

        let push = push_message(&notification);
        let push_result =
            retry_side_effect("notification.push", self.retry, || self.gateway.deliver(&push)).await;
        let pushed = match push_result {
            Ok(()) => DeliveryStatus::Delivered,
            Err(exhausted) => {
                let effect = PendingEffect::PushNotification { message: push };
                defer(&*self.outbox, effect, exhausted.attempts, &exhausted, self.clock.utc()).await
            }
        };

        debug!(
            notification_id = %notification.id,
            recipient = %notification.user_id,
            kind = %kind,
            ?stored,
            ?pushed,
            "notification emitted"
        );
        NotificationReceipt {
            id: notification.id,
            stored,
            pushed,
        }
    }

    /// Replays deferred inbox writes and pushes, once each.
    ///
    /// Replayed entries are removed; entries that fail again stay queued
    /// with their attempt count bumped. Chat bindings are left for the
    /// lifecycle drain.
    ///
    /// # Errors
    ///
    /// Returns the outbox error when the queue cannot be read or updated.
    pub async fn redeliver_pending(&self) -> OutboxResult<Redelivery> {
        let mut report = Redelivery::default();
        for entry in self.outbox.pending().await? {
            let outcome = match &entry.effect {
                PendingEffect::StoreNotification { notification } => self
                    .repository
                    .store(notification)
                    .await
                    .map_err(|err| err.to_string()),
                PendingEffect::PushNotification { message } => {
                    self.gateway.deliver(message).await.map_err(|err| err.to_string())
                }
                PendingEffect::BindChat { .. } => continue,
            };
            settle(&*self.outbox, &entry, outcome, self.clock.utc(), &mut report).await?;
        }
        Ok(report)
    }

    /// Returns the user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::StoreUnavailable`] when the store fails.
    pub async fn inbox(&self, user: &UserId) -> NotificationResult<Vec<Notification>> {
        Ok(self.repository.list_for_user(user).await?)
    }

    /// Marks a notification read on behalf of `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError::NotFound`] for unknown ids and
    /// [`NotificationDomainError::NotRecipient`] when `reader` is not the
    /// recipient.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        reader: &UserId,
    ) -> NotificationResult<Notification> {
        let mut notification = self
            .repository
            .find(id)
            .await?
            .ok_or(NotificationError::NotFound(id))?;
        notification.mark_read(reader)?;
        self.repository.mark_read(id).await?;
        Ok(notification)
    }
}

fn push_message(notification: &Notification) -> PushMessage {
    let mut metadata = BTreeMap::new();
    metadata.insert("type".to_owned(), notification.kind.as_str().to_owned());
    metadata.insert("notification_id".to_owned(), notification.id.to_string());
    if let Some(task_id) = notification.task_id {
        metadata.insert("task_id".to_owned(), task_id.to_string());
    }
    PushMessage {
        user_id: notification.user_id.clone(),
        title: notification.title.clone(),
        content: notification.content.clone(),
        metadata,
    }
}
