//! In-memory integration tests for completion settlement.

use super::helpers::{Marketplace, marketplace, user};
use eyre::ensure;
use rstest::rstest;
use taskmarket::notification::domain::NotificationKind;
use taskmarket::task::{
    domain::TaskStatus,
    services::{Reconciliation, SETTLEMENT_MEMO, TaskLifecycleError, settlement_key},
};
use taskmarket::wallet::domain::{EntryKind, Money};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn twenty_dollar_task_settles_end_to_end(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    marketplace.fund(&creator, 50).await?;
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;

    marketplace.service.accept(task.id(), &performer).await?;
    marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::PickedUp, None)
        .await?;
    marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::InProgress, None)
        .await?;
    let done = marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await?;

    ensure!(done.status() == TaskStatus::Completed);
    ensure!(done.completed_at().is_some());
    ensure!(marketplace.balance(&creator).await? == Money::from_dollars(30));
    ensure!(marketplace.balance(&performer).await? == Money::from_dollars(20));

    let ledger = marketplace.service.wallet().transactions_for_task(task.id()).await?;
    ensure!(ledger.len() == 2);
    let signed_total = ledger
        .iter()
        .try_fold(Money::ZERO, |sum, entry| sum.checked_add(entry.amount));
    ensure!(signed_total == Some(Money::ZERO));
    ensure!(
        ledger
            .iter()
            .all(|entry| entry.description.starts_with(SETTLEMENT_MEMO))
    );

    ensure!(marketplace.service.progress_for(task.id()).await?.len() == 4);

    let performer_inbox = marketplace.inbox_kinds(&performer).await?;
    ensure!(
        performer_inbox
            .iter()
            .filter(|kind| **kind == NotificationKind::Achievement)
            .count()
            == 1
    );
    ensure!(performer_inbox.contains(&NotificationKind::PaymentReceived));
    ensure!(
        marketplace
            .inbox_kinds(&creator)
            .await?
            .contains(&NotificationKind::TaskCompleted)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn early_completion_skips_remaining_steps(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    marketplace.fund(&creator, 10).await?;
    let task = marketplace.post(&creator, "Quick favour", 10).await?;
    marketplace.service.accept(task.id(), &performer).await?;

    marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await?;

    ensure!(marketplace.balance(&creator).await? == Money::ZERO);
    ensure!(marketplace.balance(&performer).await? == Money::from_dollars(10));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completing_twice_pays_once(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    marketplace.fund(&creator, 50).await?;
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;
    marketplace.service.accept(task.id(), &performer).await?;
    marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await?;

    let again = marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await;

    ensure!(matches!(
        again,
        Err(TaskLifecycleError::InvalidTransition {
            from: TaskStatus::Completed,
            ..
        })
    ));
    ensure!(marketplace.balance(&creator).await? == Money::from_dollars(30));
    ensure!(marketplace.service.wallet().transactions_for_task(task.id()).await?.len() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn insufficient_funds_blocks_completion(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    marketplace.fund(&creator, 19).await?;
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;
    marketplace.service.accept(task.id(), &performer).await?;

    let result = marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await;

    ensure!(matches!(
        result,
        Err(TaskLifecycleError::InsufficientFunds { balance, requested, .. })
            if balance == Money::from_dollars(19) && requested == Money::from_dollars(20)
    ));
    let stored = marketplace.service.get_task(task.id()).await?;
    ensure!(stored.status() == TaskStatus::Accepted);
    ensure!(stored.completed_at().is_none());

    marketplace.fund(&creator, 1).await?;
    marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await?;
    ensure!(marketplace.balance(&performer).await? == Money::from_dollars(20));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reconcile_pays_nothing_twice(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    marketplace.fund(&creator, 50).await?;
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;
    marketplace.service.accept(task.id(), &performer).await?;
    marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await?;

    let outcome = marketplace.service.reconcile_settlement(task.id()).await?;

    ensure!(outcome == Reconciliation::Consistent);
    let recorded = marketplace
        .service
        .wallet()
        .find_transfer(&settlement_key(task.id()))
        .await?;
    ensure!(recorded.is_some());
    let kinds: Vec<_> = marketplace
        .service
        .wallet()
        .transactions_for_task(task.id())
        .await?
        .into_iter()
        .map(|entry| entry.kind)
        .collect();
    ensure!(kinds == vec![EntryKind::Debit, EntryKind::Credit]);
    Ok(())
}
