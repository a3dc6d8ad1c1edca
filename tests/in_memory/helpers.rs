//! Shared test helpers for in-memory integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use taskmarket::chat::{adapters::memory::InMemoryChatRepository, services::ChatService};
use taskmarket::config::{MarketplaceConfig, RetryPolicy};
use taskmarket::identity::UserId;
use taskmarket::notification::{
    adapters::memory::{InMemoryNotificationRepository, RecordingPushGateway},
    domain::NotificationKind,
    services::NotificationFanout,
};
use taskmarket::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{Task, TaskDetails},
    ports::{ProgressLog, TaskRepository},
    services::TaskLifecycleService,
};
use taskmarket::wallet::{
    adapters::memory::InMemoryWalletLedger, domain::Money, services::WalletService,
};

/// Orchestrator wired to in-memory adapters, generic over the task store.
pub type Service<R> = TaskLifecycleService<
    R,
    InMemoryWalletLedger,
    InMemoryChatRepository,
    InMemoryNotificationRepository,
    RecordingPushGateway,
    DefaultClock,
>;

/// A marketplace backed entirely by in-memory adapters.
pub struct Marketplace<R = InMemoryTaskRepository>
where
    R: TaskRepository + ProgressLog,
{
    /// Shared orchestrator.
    pub service: Arc<Service<R>>,
    /// Recorded push deliveries.
    pub push: Arc<RecordingPushGateway>,
}

impl Marketplace {
    /// Builds a marketplace over a fresh task store.
    pub fn new() -> Self {
        Self::with_tasks(Arc::new(InMemoryTaskRepository::new()))
    }
}

impl<R> Marketplace<R>
where
    R: TaskRepository + ProgressLog,
{
    /// Builds a marketplace over the given task store.
    pub fn with_tasks(tasks: Arc<R>) -> Self {
        let clock = Arc::new(DefaultClock);
        let push = Arc::new(RecordingPushGateway::new());
        let config = MarketplaceConfig {
            side_effects: RetryPolicy::once(),
            ..MarketplaceConfig::default()
        };
        let service = TaskLifecycleService::new(
            tasks,
            WalletService::new(Arc::new(InMemoryWalletLedger::new()), Arc::clone(&clock)),
            ChatService::new(Arc::new(InMemoryChatRepository::new()), Arc::clone(&clock)),
            NotificationFanout::new(
                Arc::new(InMemoryNotificationRepository::new()),
                Arc::clone(&push),
                Arc::clone(&clock),
            ),
            clock,
        )
        .with_config(config);
        Self {
            service: Arc::new(service),
            push,
        }
    }

    /// Credits `dollars` to `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credit is rejected.
    pub async fn fund(&self, user: &UserId, dollars: i64) -> eyre::Result<()> {
        self.service
            .wallet()
            .credit(user, Money::from_dollars(dollars), "top-up", None)
            .await?;
        Ok(())
    }

    /// Returns the user's balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the wallet store fails.
    pub async fn balance(&self, user: &UserId) -> eyre::Result<Money> {
        Ok(self.service.wallet().get_balance(user).await?)
    }

    /// Posts a task priced in whole dollars.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is rejected.
    pub async fn post(&self, creator: &UserId, title: &str, dollars: i64) -> eyre::Result<Task> {
        Ok(self
            .service
            .create_task(creator, TaskDetails::new(title, Money::from_dollars(dollars)))
            .await?)
    }

    /// Returns the kinds in the user's inbox, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification store fails.
    pub async fn inbox_kinds(&self, user: &UserId) -> eyre::Result<Vec<NotificationKind>> {
        Ok(self
            .service
            .notifications()
            .inbox(user)
            .await?
            .into_iter()
            .map(|notification| notification.kind)
            .collect())
    }
}

/// Provides a fresh marketplace for each test.
#[fixture]
pub fn marketplace() -> Marketplace {
    Marketplace::new()
}

/// Builds a user id.
///
/// # Panics
///
/// Panics if `id` is not a valid identifier.
pub fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}
