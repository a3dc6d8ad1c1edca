//! Side effects deferred while a collaborator is down are replayed later.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::support::user;
use crate::chat::{
    adapters::memory::InMemoryChatRepository,
    domain::{ChatMessage, ChatThread, ParticipantPair, ThreadId},
    ports::{ChatRepository, ChatRepositoryError, ChatRepositoryResult},
    services::ChatService,
};
use crate::config::{MarketplaceConfig, RetryPolicy};
use crate::identity::UserId;
use crate::notification::{
    adapters::memory::{InMemoryNotificationRepository, RecordingPushGateway},
    services::NotificationFanout,
};
use crate::outbox::{
    domain::{PendingEffect, Redelivery},
    ports::Outbox,
};
use crate::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{TaskDetails, TaskId, TaskStatus},
    services::TaskLifecycleService,
};
use crate::wallet::{
    adapters::memory::InMemoryWalletLedger, domain::Money, services::WalletService,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::ensure;
use mockable::DefaultClock;

/// Chat store whose thread upserts fail while `down` is set.
#[derive(Default)]
struct SwitchableChat {
    inner: InMemoryChatRepository,
    down: AtomicBool,
}

#[async_trait]
impl ChatRepository for SwitchableChat {
    async fn upsert_thread(
        &self,
        participants: &ParticipantPair,
        task_id: Option<TaskId>,
        at: DateTime<Utc>,
    ) -> ChatRepositoryResult<ChatThread> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ChatRepositoryError::persistence(std::io::Error::other(
                "chat store offline",
            )));
        }
        self.inner.upsert_thread(participants, task_id, at).await
    }

    async fn find_thread(&self, id: ThreadId) -> ChatRepositoryResult<Option<ChatThread>> {
        self.inner.find_thread(id).await
    }

    async fn append_message(&self, message: &ChatMessage) -> ChatRepositoryResult<ChatThread> {
        self.inner.append_message(message).await
    }

    async fn messages_in_thread(&self, id: ThreadId) -> ChatRepositoryResult<Vec<ChatMessage>> {
        self.inner.messages_in_thread(id).await
    }

    async fn messages_for_task(&self, task_id: TaskId) -> ChatRepositoryResult<Vec<ChatMessage>> {
        self.inner.messages_for_task(task_id).await
    }

    async fn threads_for_user(&self, user: &UserId) -> ChatRepositoryResult<Vec<ChatThread>> {
        self.inner.threads_for_user(user).await
    }
}

type ChatOutageService = TaskLifecycleService<
    InMemoryTaskRepository,
    InMemoryWalletLedger,
    SwitchableChat,
    InMemoryNotificationRepository,
    RecordingPushGateway,
    DefaultClock,
>;

fn service_with(chat: &Arc<SwitchableChat>) -> ChatOutageService {
    let clock = Arc::new(DefaultClock);
    let config = MarketplaceConfig {
        side_effects: RetryPolicy::once(),
        ..MarketplaceConfig::default()
    };
    TaskLifecycleService::new(
        Arc::new(InMemoryTaskRepository::new()),
        WalletService::new(Arc::new(InMemoryWalletLedger::new()), Arc::clone(&clock)),
        ChatService::new(Arc::clone(chat), Arc::clone(&clock)),
        NotificationFanout::new(
            Arc::new(InMemoryNotificationRepository::new()),
            Arc::new(RecordingPushGateway::new()),
            Arc::clone(&clock),
        ),
        clock,
    )
    .with_config(config)
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_binding_is_replayed_after_an_outage() -> eyre::Result<()> {
    let chat = Arc::new(SwitchableChat::default());
    chat.down.store(true, Ordering::SeqCst);
    let service = service_with(&chat);
    let (creator, performer) = (user("u1"), user("u2"));
    let task = service
        .create_task(&creator, TaskDetails::new("Return library books", Money::from_dollars(5)))
        .await?;

    let accepted = service.accept(task.id(), &performer).await?;

    ensure!(accepted.status() == TaskStatus::Accepted);
    ensure!(service.chat().threads_for_user(&creator).await?.is_empty());
    let pending = service.notifications().outbox().pending().await?;
    ensure!(pending.len() == 1);
    ensure!(pending.iter().all(|entry| matches!(
        &entry.effect,
        PendingEffect::BindChat { task_id, .. } if *task_id == task.id()
    )));

    let still_down = service.redeliver_pending().await?;
    ensure!(still_down == Redelivery { delivered: 0, still_pending: 1 });

    chat.down.store(false, Ordering::SeqCst);
    let recovered = service.redeliver_pending().await?;

    ensure!(recovered == Redelivery { delivered: 1, still_pending: 0 });
    ensure!(service.notifications().outbox().pending().await?.is_empty());
    let threads = service.chat().threads_for_user(&performer).await?;
    ensure!(threads.len() == 1);
    ensure!(threads.first().and_then(|thread| thread.last_task_id()) == Some(task.id()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn draining_an_empty_outbox_delivers_nothing() -> eyre::Result<()> {
    let service = service_with(&Arc::new(SwitchableChat::default()));

    let report = service.redeliver_pending().await?;

    ensure!(report == Redelivery::default());
    Ok(())
}
