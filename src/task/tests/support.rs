//! Shared fixtures for task service tests.

use std::sync::Arc;

use crate::chat::{adapters::memory::InMemoryChatRepository, services::ChatService};
use crate::config::{MarketplaceConfig, RetryPolicy};
use crate::identity::UserId;
use crate::notification::{
    adapters::memory::{InMemoryNotificationRepository, RecordingPushGateway},
    services::NotificationFanout,
};
use crate::task::{adapters::memory::InMemoryTaskRepository, services::TaskLifecycleService};
use crate::wallet::{
    adapters::memory::InMemoryWalletLedger, domain::Money, services::WalletService,
};
use mockable::DefaultClock;

pub(super) type TestService = TaskLifecycleService<
    InMemoryTaskRepository,
    InMemoryWalletLedger,
    InMemoryChatRepository,
    InMemoryNotificationRepository,
    RecordingPushGateway,
    DefaultClock,
>;

pub(super) struct Harness {
    pub(super) service: TestService,
    pub(super) tasks: Arc<InMemoryTaskRepository>,
    pub(super) push: Arc<RecordingPushGateway>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let clock = Arc::new(DefaultClock);
        let tasks = Arc::new(InMemoryTaskRepository::new());
        let push = Arc::new(RecordingPushGateway::new());
        let config = MarketplaceConfig {
            side_effects: RetryPolicy::once(),
            ..MarketplaceConfig::default()
        };
        let service = TaskLifecycleService::new(
            Arc::clone(&tasks),
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
            service,
            tasks,
            push,
        }
    }

    pub(super) async fn fund(&self, user: &UserId, dollars: i64) {
        self.service
            .wallet()
            .credit(user, Money::from_dollars(dollars), "top-up", None)
            .await
            .expect("top-up should succeed");
    }

    pub(super) async fn balance(&self, user: &UserId) -> Money {
        self.service
            .wallet()
            .get_balance(user)
            .await
            .expect("balance lookup should succeed")
    }
}

pub(super) fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}
