//! Shared world state for marketplace settlement BDD scenarios.

use std::sync::Arc;

use eyre::WrapErr;
use mockable::DefaultClock;
use rstest::fixture;
use taskmarket::chat::{adapters::memory::InMemoryChatRepository, services::ChatService};
use taskmarket::identity::UserId;
use taskmarket::notification::{
    adapters::memory::{InMemoryNotificationRepository, RecordingPushGateway},
    services::NotificationFanout,
};
use taskmarket::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::Task,
    services::{TaskLifecycleError, TaskLifecycleService},
};
use taskmarket::wallet::{adapters::memory::InMemoryWalletLedger, services::WalletService};

/// Service type used by the BDD world.
pub type TestMarketplace = TaskLifecycleService<
    InMemoryTaskRepository,
    InMemoryWalletLedger,
    InMemoryChatRepository,
    InMemoryNotificationRepository,
    RecordingPushGateway,
    DefaultClock,
>;

/// Scenario world for settlement behaviour tests.
pub struct MarketplaceWorld {
    pub service: TestMarketplace,
    pub current_task: Option<Task>,
    pub last_result: Option<Result<Task, TaskLifecycleError>>,
}

impl MarketplaceWorld {
    /// Creates a world with empty wallets and an empty board.
    #[must_use]
    pub fn new() -> Self {
        let clock = Arc::new(DefaultClock);
        let service = TaskLifecycleService::new(
            Arc::new(InMemoryTaskRepository::new()),
            WalletService::new(Arc::new(InMemoryWalletLedger::new()), Arc::clone(&clock)),
            ChatService::new(Arc::new(InMemoryChatRepository::new()), Arc::clone(&clock)),
            NotificationFanout::new(
                Arc::new(InMemoryNotificationRepository::new()),
                Arc::new(RecordingPushGateway::new()),
                Arc::clone(&clock),
            ),
            clock,
        );

        Self {
            service,
            current_task: None,
            last_result: None,
        }
    }

    /// Returns the task the scenario is working on.
    pub fn task(&self) -> eyre::Result<&Task> {
        self.current_task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing posted task in scenario world"))
    }
}

impl Default for MarketplaceWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> MarketplaceWorld {
    MarketplaceWorld::default()
}

/// Parses a scenario user name.
pub fn user(name: &str) -> eyre::Result<UserId> {
    UserId::new(name).wrap_err("scenario user id")
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
