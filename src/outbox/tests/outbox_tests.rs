//! Outbox tests: queue order, replay bookkeeping, and payload encoding.

use std::collections::BTreeMap;

use crate::identity::UserId;
use crate::notification::ports::PushMessage;
use crate::outbox::{
    adapters::memory::InMemoryOutbox,
    domain::{DeliveryStatus, OutboxEntry, OutboxEntryId, PendingEffect, Redelivery},
    ports::{Outbox, OutboxError, OutboxResult},
    services::{defer, settle},
};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::ensure;
use mockall::mock;
use rstest::{fixture, rstest};

mock! {
    pub Store {}

    #[async_trait]
    impl Outbox for Store {
        async fn enqueue(&self, entry: &OutboxEntry) -> OutboxResult<()>;
        async fn pending(&self) -> OutboxResult<Vec<OutboxEntry>>;
        async fn acknowledge(&self, id: OutboxEntryId) -> OutboxResult<()>;
        async fn record_failure(
            &self,
            id: OutboxEntryId,
            error: &str,
            at: DateTime<Utc>,
        ) -> OutboxResult<()>;
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id).expect("valid user id")
}

fn push_effect(title: &str) -> PendingEffect {
    PendingEffect::PushNotification {
        message: PushMessage {
            user_id: user("u1"),
            title: title.to_owned(),
            content: "u2 accepted \"Pick up textbook\".".to_owned(),
            metadata: BTreeMap::from([("type".to_owned(), "task_accepted".to_owned())]),
        },
    }
}

#[fixture]
fn outbox() -> InMemoryOutbox {
    InMemoryOutbox::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pending_lists_entries_oldest_first(outbox: InMemoryOutbox) -> eyre::Result<()> {
    let first = OutboxEntry::defer(push_effect("first"), 3, "push down", Utc::now());
    let second = OutboxEntry::defer(push_effect("second"), 3, "push down", Utc::now());
    outbox.enqueue(&first).await?;
    outbox.enqueue(&second).await?;
    outbox.enqueue(&first).await?;

    let ids: Vec<_> = outbox.pending().await?.iter().map(|entry| entry.id).collect();
    ensure!(ids == vec![first.id, second.id]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn settle_acknowledges_success_and_counts_failures(
    outbox: InMemoryOutbox,
) -> eyre::Result<()> {
    let recovered = OutboxEntry::defer(push_effect("recovered"), 3, "push down", Utc::now());
    let stuck = OutboxEntry::defer(push_effect("stuck"), 3, "push down", Utc::now());
    outbox.enqueue(&recovered).await?;
    outbox.enqueue(&stuck).await?;

    let mut report = Redelivery::default();
    settle(&outbox, &recovered, Ok(()), Utc::now(), &mut report).await?;
    settle(&outbox, &stuck, Err("still down".to_owned()), Utc::now(), &mut report).await?;

    ensure!(report == Redelivery { delivered: 1, still_pending: 1 });
    let pending = outbox.pending().await?;
    ensure!(pending.len() == 1);
    let remaining = pending.first().ok_or_else(|| eyre::eyre!("outbox is empty"))?;
    ensure!(remaining.id == stuck.id);
    ensure!(remaining.attempts == 4);
    ensure!(remaining.last_error == "still down");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn acknowledging_twice_is_harmless(outbox: InMemoryOutbox) -> eyre::Result<()> {
    let entry = OutboxEntry::defer(push_effect("once"), 3, "push down", Utc::now());
    outbox.enqueue(&entry).await?;
    outbox.acknowledge(entry.id).await?;
    outbox.acknowledge(entry.id).await?;
    outbox
        .record_failure(entry.id, "late failure", Utc::now())
        .await?;
    ensure!(outbox.pending().await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn defer_queues_the_effect(outbox: InMemoryOutbox) -> eyre::Result<()> {
    let status = defer(&outbox, push_effect("later"), 3, "push down", Utc::now()).await;

    let pending = outbox.pending().await?;
    let entry = pending.first().ok_or_else(|| eyre::eyre!("nothing deferred"))?;
    ensure!(status == DeliveryStatus::Deferred(entry.id));
    ensure!(entry.attempts == 3);
    ensure!(entry.last_error == "push down");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn defer_reports_dropped_when_the_outbox_fails() {
    let mut store = MockStore::new();
    store
        .expect_enqueue()
        .times(1)
        .returning(|_| Err(OutboxError::persistence(std::io::Error::other("disk full"))));

    let status = defer(&store, push_effect("lost"), 3, "push down", Utc::now()).await;

    assert_eq!(status, DeliveryStatus::Dropped);
}

#[rstest]
#[case::push(push_effect("hello"), "push_notification", "notification.push")]
#[case::chat(
    PendingEffect::BindChat { creator: user("alice"), performer: user("bob"), task_id: TaskId::new() },
    "bind_chat",
    "chat.resolve"
)]
fn payloads_are_tagged_by_effect(
    #[case] effect: PendingEffect,
    #[case] tag: &str,
    #[case] name: &str,
) {
    let payload = effect.to_payload().expect("effect should encode");
    assert_eq!(payload["effect"], tag);
    assert_eq!(effect.name(), name);
    let decoded = PendingEffect::from_payload(payload).expect("payload should decode");
    assert_eq!(decoded, effect);
}
