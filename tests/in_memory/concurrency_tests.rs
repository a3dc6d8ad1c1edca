//! In-memory integration tests for racing writers.

use std::sync::{Arc, Mutex};

use super::helpers::{Marketplace, marketplace, user};
use async_trait::async_trait;
use eyre::ensure;
use mockable::DefaultClock;
use rstest::rstest;
use taskmarket::identity::UserId;
use taskmarket::live::Subscription;
use taskmarket::notification::domain::NotificationKind;
use taskmarket::task::{
    adapters::memory::InMemoryTaskRepository,
    domain::{
        ProgressEntry, ProgressEntryId, Task, TaskDetailsPatch, TaskFilter, TaskId, TaskStatus,
    },
    ports::{
        ProgressLog, TaskGuard, TaskRepository, TaskRepositoryResult, TaskTransition,
        TransitionReceipt,
    },
    services::{TaskLifecycleError, reversal_key},
};
use taskmarket::wallet::domain::Money;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exactly_one_of_many_accepts_wins(marketplace: Marketplace) -> eyre::Result<()> {
    let task = marketplace.post(&user("u1"), "Popular errand", 5).await?;

    let mut handles = Vec::new();
    for index in 0..8 {
        let service = Arc::clone(&marketplace.service);
        let task_id = task.id();
        handles.push(tokio::spawn(async move {
            let performer = UserId::new(format!("runner-{index}")).expect("valid user id");
            service.accept(task_id, &performer).await
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        match handle.await? {
            Ok(accepted) => winners.push(accepted),
            Err(TaskLifecycleError::AlreadyAccepted { status, .. }) => {
                ensure!(status == TaskStatus::Accepted);
                losers += 1;
            }
            Err(other) => eyre::bail!("unexpected accept failure: {other}"),
        }
    }

    ensure!(winners.len() == 1);
    ensure!(losers == 7);
    let stored = marketplace.service.get_task(task.id()).await?;
    let winner = winners
        .first()
        .ok_or_else(|| eyre::eyre!("no winner"))?;
    ensure!(stored.accepted_by() == winner.accepted_by());
    ensure!(stored.parties_consistent());
    ensure!(marketplace.service.progress_for(task.id()).await?.len() == 1);
    Ok(())
}

/// A write that lands just before the wrapped store commits, reproducing a
/// caller losing its race.
enum Interference {
    /// `canceller` cancels right before the first completion commit.
    CancelBeforeCompletion { canceller: UserId },
    /// `performer` accepts right before the first details update.
    AcceptBeforeEdit { performer: UserId },
}

/// Task store that injects one [`Interference`] and otherwise delegates.
struct InterleavingRepository {
    inner: InMemoryTaskRepository,
    interference: Mutex<Option<Interference>>,
}

impl InterleavingRepository {
    fn new(interference: Interference) -> Self {
        Self {
            inner: InMemoryTaskRepository::new(),
            interference: Mutex::new(Some(interference)),
        }
    }

    fn take_if(&self, wanted: impl Fn(&Interference) -> bool) -> Option<Interference> {
        let mut slot = self.interference.lock().ok()?;
        if slot.as_ref().is_some_and(wanted) {
            slot.take()
        } else {
            None
        }
    }

    async fn interfere(
        &self,
        task_id: TaskId,
        interference: Interference,
    ) -> TaskRepositoryResult<()> {
        let Some(mut task) = self.inner.find_by_id(task_id).await? else {
            return Ok(());
        };
        let expected = TaskGuard::observed(&task);
        let (actor, counted) = match interference {
            Interference::CancelBeforeCompletion { canceller } => {
                task.cancel(&canceller, "found someone closer", &DefaultClock)
                    .expect("in-flight task can be cancelled by its creator");
                (canceller.clone(), Some(canceller))
            }
            Interference::AcceptBeforeEdit { performer } => {
                task.accept(&performer, &DefaultClock)
                    .expect("open task can be accepted");
                (performer, None)
            }
        };
        let progress =
            ProgressEntry::record(task_id, task.status(), actor, None, task.updated_at());
        self.inner
            .commit_transition(&TaskTransition {
                task,
                expected,
                progress,
                count_cancellation_for: counted,
                count_completion_for: None,
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for InterleavingRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        self.inner.store(task).await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.inner.find_by_id(id).await
    }

    async fn update_details(&self, task: &Task, expected: &TaskGuard) -> TaskRepositoryResult<()> {
        if let Some(interference) =
            self.take_if(|pending| matches!(pending, Interference::AcceptBeforeEdit { .. }))
        {
            self.interfere(task.id(), interference).await?;
        }
        self.inner.update_details(task, expected).await
    }

    async fn commit_transition(
        &self,
        transition: &TaskTransition,
    ) -> TaskRepositoryResult<TransitionReceipt> {
        if transition.task.status() == TaskStatus::Completed {
            if let Some(interference) = self.take_if(|pending| {
                matches!(pending, Interference::CancelBeforeCompletion { .. })
            }) {
                self.interfere(transition.task.id(), interference).await?;
            }
        }
        self.inner.commit_transition(transition).await
    }

    async fn query(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        self.inner.query(filter).await
    }

    async fn subscribe(&self, filter: TaskFilter) -> TaskRepositoryResult<Subscription<Task>> {
        TaskRepository::subscribe(&self.inner, filter).await
    }

    async fn cancellation_count(&self, user: &UserId) -> TaskRepositoryResult<u32> {
        self.inner.cancellation_count(user).await
    }

    async fn count_completed_by(&self, user: &UserId) -> TaskRepositoryResult<u64> {
        self.inner.count_completed_by(user).await
    }
}

#[async_trait]
impl ProgressLog for InterleavingRepository {
    async fn append(&self, entry: &ProgressEntry) -> TaskRepositoryResult<ProgressEntryId> {
        self.inner.append(entry).await
    }

    async fn list_for(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<ProgressEntry>> {
        self.inner.list_for(task_id).await
    }

    async fn subscribe(
        &self,
        task_id: TaskId,
    ) -> TaskRepositoryResult<Subscription<ProgressEntry>> {
        ProgressLog::subscribe(&self.inner, task_id).await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_losing_to_cancellation_is_refunded() -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    let marketplace = Marketplace::with_tasks(Arc::new(InterleavingRepository::new(
        Interference::CancelBeforeCompletion {
            canceller: creator.clone(),
        },
    )));
    marketplace.fund(&creator, 50).await?;
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;
    marketplace.service.accept(task.id(), &performer).await?;

    let result = marketplace
        .service
        .advance(task.id(), &performer, TaskStatus::Completed, None)
        .await;

    ensure!(matches!(
        result,
        Err(TaskLifecycleError::InvalidTransition {
            from: TaskStatus::Cancelled,
            to: TaskStatus::Completed,
        })
    ));
    let stored = marketplace.service.get_task(task.id()).await?;
    ensure!(stored.status() == TaskStatus::Cancelled);
    ensure!(stored.completed_at().is_none());
    ensure!(marketplace.balance(&creator).await? == Money::from_dollars(50));
    ensure!(marketplace.balance(&performer).await? == Money::ZERO);
    ensure!(
        marketplace
            .service
            .wallet()
            .find_transfer(&reversal_key(task.id()))
            .await?
            .is_some()
    );
    ensure!(marketplace.service.wallet().transactions_for_task(task.id()).await?.len() == 4);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_completion_and_cancellation_stay_consistent(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    marketplace.fund(&creator, 50).await?;
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;
    marketplace.service.accept(task.id(), &performer).await?;

    let completing = {
        let service = Arc::clone(&marketplace.service);
        let performer = performer.clone();
        let task_id = task.id();
        tokio::spawn(async move {
            service
                .advance(task_id, &performer, TaskStatus::Completed, None)
                .await
        })
    };
    let cancelling = {
        let service = Arc::clone(&marketplace.service);
        let creator = creator.clone();
        let task_id = task.id();
        tokio::spawn(async move { service.cancel(task_id, &creator, "changed my mind").await })
    };
    let completed = completing.await?;
    let cancelled = cancelling.await?;

    ensure!(completed.is_ok() != cancelled.is_ok(), "exactly one writer must win");
    let stored = marketplace.service.get_task(task.id()).await?;
    let creator_balance = marketplace.balance(&creator).await?;
    let performer_balance = marketplace.balance(&performer).await?;
    match stored.status() {
        TaskStatus::Completed => {
            ensure!(creator_balance == Money::from_dollars(30));
            ensure!(performer_balance == Money::from_dollars(20));
        }
        TaskStatus::Cancelled => {
            ensure!(creator_balance == Money::from_dollars(50));
            ensure!(performer_balance == Money::ZERO);
        }
        other => eyre::bail!("task ended in unexpected status {other}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_losing_to_acceptance_reports_the_stored_state() -> eyre::Result<()> {
    let (creator, performer) = (user("u1"), user("u2"));
    let marketplace = Marketplace::with_tasks(Arc::new(InterleavingRepository::new(
        Interference::AcceptBeforeEdit {
            performer: performer.clone(),
        },
    )));
    let task = marketplace.post(&creator, "Collect dry cleaning", 20).await?;

    let result = marketplace
        .service
        .edit_details(
            task.id(),
            &creator,
            TaskDetailsPatch {
                title: Some("Collect two suits".to_owned()),
                ..TaskDetailsPatch::default()
            },
        )
        .await;

    ensure!(
        matches!(
            result,
            Err(TaskLifecycleError::AlreadyAccepted {
                status: TaskStatus::Accepted,
                ..
            })
        ),
        "expected AlreadyAccepted, got {result:?}"
    );
    let stored = marketplace.service.get_task(task.id()).await?;
    ensure!(stored.title() == "Collect dry cleaning");
    ensure!(stored.accepted_by() == Some(&performer));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn simultaneous_first_completions_earn_one_achievement(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let performer = user("runner");
    let mut task_ids = Vec::new();
    for creator in ["u1", "u2"] {
        let task = marketplace.post(&user(creator), "Coffee run", 0).await?;
        marketplace.service.accept(task.id(), &performer).await?;
        task_ids.push(task.id());
    }

    let handles: Vec<_> = task_ids
        .into_iter()
        .map(|task_id| {
            let service = Arc::clone(&marketplace.service);
            let performer = performer.clone();
            tokio::spawn(async move {
                service
                    .advance(task_id, &performer, TaskStatus::Completed, None)
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    let achievements = marketplace
        .inbox_kinds(&performer)
        .await?
        .into_iter()
        .filter(|kind| *kind == NotificationKind::Achievement)
        .count();
    ensure!(achievements == 1, "expected one achievement, got {achievements}");
    ensure!(marketplace.service.completion_count(&performer).await? == 2);
    Ok(())
}
