//! In-memory integration tests for cancellation and fees.

use super::helpers::{Marketplace, marketplace, user};
use eyre::ensure;
use rstest::rstest;
use taskmarket::notification::domain::NotificationKind;
use taskmarket::task::{
    domain::TaskStatus,
    services::{FeeOutcome, TaskLifecycleError},
};
use taskmarket::wallet::domain::Money;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fourth_cancellation_of_five_dollar_task_costs_one_dollar(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let creator = user("u1");
    marketplace.fund(&creator, 10).await?;
    for index in 1..=3 {
        let task = marketplace.post(&creator, &format!("Errand {index}"), 5).await?;
        marketplace.service.cancel(task.id(), &creator, "plans changed").await?;
    }
    ensure!(marketplace.service.cancellation_count(&creator).await? == 3);
    ensure!(marketplace.balance(&creator).await? == Money::from_dollars(10));

    let fourth = marketplace.post(&creator, "Errand 4", 5).await?;
    let outcome = marketplace
        .service
        .cancel(fourth.id(), &creator, "plans changed")
        .await?;

    ensure!(outcome.task.status() == TaskStatus::Cancelled);
    ensure!(outcome.task.accepted_by().is_none());
    ensure!(outcome.cancellation_count == 4);
    ensure!(matches!(
        outcome.fee,
        FeeOutcome::Charged { amount, .. } if amount == Money::from_dollars(1)
    ));
    ensure!(marketplace.service.cancellation_count(&creator).await? == 4);
    ensure!(marketplace.balance(&creator).await? == Money::from_dollars(9));
    ensure!(
        marketplace
            .inbox_kinds(&creator)
            .await?
            .contains(&NotificationKind::CancellationFee)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn free_task_cancellations_never_charge(marketplace: Marketplace) -> eyre::Result<()> {
    let creator = user("u1");
    marketplace.fund(&creator, 10).await?;
    for index in 1..=5 {
        let task = marketplace.post(&creator, &format!("Favour {index}"), 0).await?;
        let outcome = marketplace.service.cancel(task.id(), &creator, "sorted").await?;
        ensure!(outcome.fee == FeeOutcome::NotApplicable);
    }

    ensure!(marketplace.balance(&creator).await? == Money::from_dollars(10));
    ensure!(marketplace.service.cancellation_count(&creator).await? == 5);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_task_rejects_further_changes(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    let task = marketplace.post(&creator, "Errand", 5).await?;
    marketplace.service.accept(task.id(), &performer).await?;
    marketplace.service.cancel(task.id(), &creator, "not needed").await?;

    let advance = marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::PickedUp, None)
        .await;
    let cancel = marketplace.service.cancel(task.id(), &performer, "again").await;

    ensure!(matches!(
        advance,
        Err(TaskLifecycleError::InvalidTransition {
            from: TaskStatus::Cancelled,
            ..
        })
    ));
    ensure!(matches!(
        cancel,
        Err(TaskLifecycleError::InvalidTransition {
            from: TaskStatus::Cancelled,
            to: TaskStatus::Cancelled,
        })
    ));
    ensure!(marketplace.service.cancellation_count(&performer).await? == 0);
    ensure!(
        marketplace
            .inbox_kinds(&performer)
            .await?
            .first()
            == Some(&NotificationKind::TaskCancelled)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn strangers_cannot_cancel(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post(&user("u1"), "Errand", 5).await?;

    let result = marketplace.service.cancel(task.id(), &user("u9"), "spite").await;

    ensure!(matches!(result, Err(TaskLifecycleError::NotParticipant(_))));
    ensure!(marketplace.service.get_task(task.id()).await?.status() == TaskStatus::Open);
    Ok(())
}
