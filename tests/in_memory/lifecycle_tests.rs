//! In-memory integration tests for posting, acceptance, and progress.

use super::helpers::{Marketplace, marketplace, user};
use eyre::ensure;
use rstest::rstest;
use taskmarket::notification::domain::NotificationKind;
use taskmarket::task::{
    domain::{TaskFilter, TaskStatus},
    services::{ErrorKind, TaskLifecycleError},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn board_lists_open_tasks_newest_first(marketplace: Marketplace) -> eyre::Result<()> {
    let creator = user("u1");
    let older = marketplace.post(&creator, "Water plants", 3).await?;
    let newer = marketplace.post(&creator, "Return library book", 4).await?;
    marketplace.service.accept(older.id(), &user("u2")).await?;

    let board = marketplace.service.list_tasks(&TaskFilter::open()).await?;
    let mine = marketplace
        .service
        .list_tasks(&TaskFilter::posted_by(creator.clone()))
        .await?;
    let performing = marketplace
        .service
        .list_tasks(&TaskFilter::performed_by(user("u2")))
        .await?;

    ensure!(board.iter().map(|task| task.id()).collect::<Vec<_>>() == vec![newer.id()]);
    ensure!(mine.len() == 2);
    ensure!(mine.first().map(|task| task.created_at()) >= mine.last().map(|task| task.created_at()));
    ensure!(performing.iter().map(|task| task.id()).collect::<Vec<_>>() == vec![older.id()]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn performer_progress_is_logged_and_announced(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    let task = marketplace.post(&creator, "Deliver lunch", 8).await?;
    marketplace.service.accept(task.id(), &performer).await?;

    let mut progress = marketplace.service.subscribe_progress(task.id()).await?;
    ensure!(progress.next().await.map(|entries| entries.len()) == Some(1));

    for (target, note) in [
        (TaskStatus::PickedUp, None),
        (TaskStatus::InProgress, None),
        (TaskStatus::OnWay, Some("crossing the quad".to_owned())),
        (TaskStatus::Delivered, None),
    ] {
        marketplace
            .service
            .advance(task.id(), &performer, target, note)
            .await?;
        let snapshot = progress
            .next()
            .await
            .ok_or_else(|| eyre::eyre!("progress stream closed"))?;
        ensure!(snapshot.last().map(|entry| entry.status) == Some(target));
    }

    let entries = marketplace.service.progress_for(task.id()).await?;
    ensure!(entries.len() == 5);
    ensure!(entries.iter().all(|entry| entry.actor_id == performer));
    ensure!(
        entries
            .iter()
            .find(|entry| entry.status == TaskStatus::OnWay)
            .and_then(|entry| entry.notes.as_deref())
            == Some("crossing the quad")
    );

    let updates = marketplace
        .inbox_kinds(&creator)
        .await?
        .into_iter()
        .filter(|kind| *kind == NotificationKind::StatusUpdate)
        .count();
    ensure!(updates == 4);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn out_of_order_step_is_rejected(marketplace: Marketplace) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    let task = marketplace.post(&creator, "Deliver lunch", 8).await?;
    marketplace.service.accept(task.id(), &performer).await?;

    let result = marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Delivered, None)
        .await;

    ensure!(matches!(
        result,
        Err(TaskLifecycleError::InvalidTransition {
            from: TaskStatus::Accepted,
            to: TaskStatus::Delivered,
        })
    ));
    ensure!(marketplace.service.progress_for(task.id()).await?.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn advancing_an_open_task_needs_a_performer(marketplace: Marketplace) -> eyre::Result<()> {
    let creator = user("u1");
    let task = marketplace.post(&creator, "Deliver lunch", 8).await?;

    let result = marketplace
        .service
        .advance(task.id(), &creator, TaskStatus::PickedUp, None)
        .await;

    ensure!(result.map_err(|err| err.kind()).err() == Some(ErrorKind::NotPerformer));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn board_subscription_follows_new_and_taken_tasks(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let creator = user("u1");
    let mut board = marketplace.service.subscribe_tasks(TaskFilter::open()).await?;
    ensure!(board.next().await == Some(Vec::new()));

    let task = marketplace.post(&creator, "Feed the cat", 6).await?;
    ensure!(board.next().await == Some(vec![task.clone()]));

    marketplace.service.accept(task.id(), &user("u2")).await?;
    ensure!(board.next().await == Some(Vec::new()));

    board.cancel();
    marketplace.post(&creator, "Another", 1).await?;
    Ok(())
}
