//! Task lifecycle orchestrator: creation, acceptance, progress, and queries.
//!
//! Completion settlement lives in `settlement.rs` and cancellation in
//! `cancellation.rs`; both extend [`TaskLifecycleService`].

use super::error::{TaskLifecycleError, TaskLifecycleResult};
use crate::chat::{ports::ChatRepository, services::ChatService};
use crate::config::MarketplaceConfig;
use crate::identity::UserId;
use crate::live::Subscription;
use crate::notification::{
    domain::{CopyContext, NotificationKind},
    ports::{NotificationRepository, PushGateway},
    services::{NotificationFanout, NotificationRequest},
};
use crate::outbox::{
    adapters::memory::InMemoryOutbox,
    domain::{PendingEffect, Redelivery},
    ports::Outbox,
    services::{defer, settle},
};
use crate::retry::retry_side_effect;
use crate::task::{
    domain::{
        ProgressEntry, Task, TaskDetails, TaskDetailsPatch, TaskDomainError, TaskFilter, TaskId,
        TaskStatus,
    },
    ports::{
        ProgressLog, TaskGuard, TaskRepository, TaskRepositoryError, TaskTransition,
        TransitionReceipt,
    },
};
use crate::wallet::{ports::WalletLedger, services::WalletService};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// Task lifecycle orchestration service.
///
/// Every status change is a conditional write guarded on the status and
/// performer the change was validated against. When a concurrent writer
/// wins, the change is re-validated against the stored task and retried up
/// to `settlement.max_commit_attempts` times, so the loser sees the guard
/// error the fresh state implies (for example `AlreadyAccepted`).
///
/// Notifications and chat binding run after the commit and are retried
/// under `side_effects`; their failure never fails the operation. Effects
/// whose retries run out wait in the fan-out's outbox until
/// [`TaskLifecycleService::redeliver_pending`] replays them.
#[derive(Clone)]
pub struct TaskLifecycleService<R, L, H, N, P, C, O = InMemoryOutbox>
where
    R: TaskRepository + ProgressLog,
    L: WalletLedger,
    H: ChatRepository,
    N: NotificationRepository,
    P: PushGateway,
    C: Clock + Send + Sync,
    O: Outbox,
{
    pub(super) tasks: Arc<R>,
    pub(super) wallet: WalletService<L, C>,
    pub(super) chat: ChatService<H, C>,
    pub(super) notifications: NotificationFanout<N, P, C, O>,
    pub(super) config: MarketplaceConfig,
    pub(super) clock: Arc<C>,
}

/// Bookkeeping attached to a committed status change.
pub(super) struct ChangeRecord<'a> {
    pub(super) actor: &'a UserId,
    pub(super) notes: Option<String>,
    pub(super) count_cancellation: bool,
    pub(super) count_completion: bool,
}

/// A committed status change.
pub(super) struct Committed {
    pub(super) task: Task,
    pub(super) receipt: TransitionReceipt,
}

impl<R, L, H, N, P, C, O> TaskLifecycleService<R, L, H, N, P, C, O>
where
    R: TaskRepository + ProgressLog,
    L: WalletLedger,
    H: ChatRepository,
    N: NotificationRepository,
    P: PushGateway,
    C: Clock + Send + Sync,
    O: Outbox,
{
    /// Creates an orchestrator with the default configuration.
    #[must_use]
    pub fn new(
        tasks: Arc<R>,
        wallet: WalletService<L, C>,
        chat: ChatService<H, C>,
        notifications: NotificationFanout<N, P, C, O>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            tasks,
            wallet,
            chat,
            notifications,
            config: MarketplaceConfig::default(),
            clock,
        }
    }

    /// Replaces the configuration. The notification retry policy follows
    /// `side_effects`.
    #[must_use]
    pub fn with_config(mut self, config: MarketplaceConfig) -> Self {
        self.notifications = self.notifications.with_retry_policy(config.side_effects);
        self.config = config;
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Returns the wallet service used for settlement and fees.
    #[must_use]
    pub const fn wallet(&self) -> &WalletService<L, C> {
        &self.wallet
    }

    /// Returns the chat service used to bind task parties.
    #[must_use]
    pub const fn chat(&self) -> &ChatService<H, C> {
        &self.chat
    }

    /// Returns the notification fan-out.
    #[must_use]
    pub const fn notifications(&self) -> &NotificationFanout<N, P, C, O> {
        &self.notifications
    }

    /// Posts a new open task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Validation`] for an empty title or a
    /// negative price.
    pub async fn create_task(
        &self,
        creator: &UserId,
        details: TaskDetails,
    ) -> TaskLifecycleResult<Task> {
        let task = Task::post(creator.clone(), details, &*self.clock)?;
        self.tasks.store(&task).await?;
        info!(task_id = %task.id(), creator = %creator, price = %task.price(), "task posted");
        Ok(task)
    }

    /// Edits the descriptive fields of an open task on behalf of its
    /// creator. Status and parties are never touched.
    ///
    /// A concurrent status change is re-validated against the stored task,
    /// so an edit racing an acceptance fails with the guard error the fresh
    /// state implies.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotParticipant`] for anyone but the
    /// creator, [`TaskLifecycleError::AlreadyAccepted`] once the task has
    /// left `open`, and [`TaskLifecycleError::Validation`] for invalid
    /// values.
    pub async fn edit_details(
        &self,
        task_id: TaskId,
        actor: &UserId,
        patch: TaskDetailsPatch,
    ) -> TaskLifecycleResult<Task> {
        let max_attempts = self.config.settlement.max_commit_attempts.max(1);
        let mut current = self.get_task(task_id).await?;
        let mut attempt = 1;
        loop {
            let expected = TaskGuard::observed(&current);
            let mut edited = current.clone();
            edited.edit_details(actor, patch.clone(), &*self.clock)?;
            match self.tasks.update_details(&edited, &expected).await {
                Ok(()) => {
                    info!(task_id = %task_id, "task details edited");
                    return Ok(edited);
                }
                Err(TaskRepositoryError::Conflict { current: latest, .. })
                    if attempt < max_attempts =>
                {
                    debug!(
                        task_id = %task_id,
                        attempt,
                        observed = %latest.status(),
                        "task changed during edit, re-validating"
                    );
                    current = *latest;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Accepts an open task on behalf of `actor`.
    ///
    /// Of two concurrent accepts exactly one commits; the other fails with
    /// [`TaskLifecycleError::AlreadyAccepted`]. On success the creator is
    /// notified and the pair's chat thread is bound to the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::SelfAcceptance`] when the creator
    /// accepts their own task and [`TaskLifecycleError::AlreadyAccepted`]
    /// unless the task is open.
    pub async fn accept(&self, task_id: TaskId, actor: &UserId) -> TaskLifecycleResult<Task> {
        let current = self.get_task(task_id).await?;
        let change = ChangeRecord {
            actor,
            notes: None,
            count_cancellation: false,
            count_completion: false,
        };
        let Committed { task, .. } = self
            .commit_change(current, change, |task| task.accept(actor, &*self.clock))
            .await?;
        info!(task_id = %task_id, performer = %actor, "task accepted");

        self.bind_chat(&task).await;
        self.notify(
            task.created_by(),
            NotificationKind::TaskAccepted,
            CopyContext::for_task(task.title()).actor(actor),
            task_id,
        )
        .await;
        Ok(task)
    }

    /// Moves a task to `target` on behalf of its performer.
    ///
    /// `target` must be the next step or `completed`. Completing settles the
    /// price first; see [`Self::complete`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotPerformer`] unless `actor` is the
    /// performer and [`TaskLifecycleError::InvalidTransition`] when
    /// `target` is not reachable.
    pub async fn advance(
        &self,
        task_id: TaskId,
        actor: &UserId,
        target: TaskStatus,
        notes: Option<String>,
    ) -> TaskLifecycleResult<Task> {
        if target == TaskStatus::Completed {
            return self.complete(task_id, actor, notes).await;
        }

        let current = self.get_task(task_id).await?;
        let change = ChangeRecord {
            actor,
            notes: notes.clone(),
            count_cancellation: false,
            count_completion: false,
        };
        let Committed { task, .. } = self
            .commit_change(current, change, |task| {
                task.advance(actor, target, &*self.clock)
            })
            .await?;
        info!(task_id = %task_id, status = %target, "task advanced");

        self.notify(
            task.created_by(),
            NotificationKind::StatusUpdate,
            CopyContext::for_task(task.title())
                .actor(actor)
                .status(target)
                .notes(notes),
            task_id,
        )
        .await;
        Ok(task)
    }

    /// Loads a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks.
    pub async fn get_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.tasks
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    /// Returns tasks matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the store fails.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.tasks.query(filter).await?)
    }

    /// Opens a live query over tasks matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the store fails.
    pub async fn subscribe_tasks(
        &self,
        filter: TaskFilter,
    ) -> TaskLifecycleResult<Subscription<Task>> {
        Ok(TaskRepository::subscribe(&*self.tasks, filter).await?)
    }

    /// Returns the task's progress log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the store fails.
    pub async fn progress_for(&self, task_id: TaskId) -> TaskLifecycleResult<Vec<ProgressEntry>> {
        Ok(self.tasks.list_for(task_id).await?)
    }

    /// Opens a live query over the task's progress log.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the store fails.
    pub async fn subscribe_progress(
        &self,
        task_id: TaskId,
    ) -> TaskLifecycleResult<Subscription<ProgressEntry>> {
        Ok(ProgressLog::subscribe(&*self.tasks, task_id).await?)
    }

    /// Returns how many tasks `user` has cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the store fails.
    pub async fn cancellation_count(&self, user: &UserId) -> TaskLifecycleResult<u32> {
        Ok(self.tasks.cancellation_count(user).await?)
    }

    /// Returns how many tasks `user` has completed as performer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the store fails.
    pub async fn completion_count(&self, user: &UserId) -> TaskLifecycleResult<u64> {
        Ok(self.tasks.count_completed_by(user).await?)
    }

    /// Applies `apply` to `current` and commits the result conditionally,
    /// re-validating against the stored task after each lost race.
    pub(super) async fn commit_change<F>(
        &self,
        mut current: Task,
        change: ChangeRecord<'_>,
        mut apply: F,
    ) -> TaskLifecycleResult<Committed>
    where
        F: FnMut(&mut Task) -> Result<(), TaskDomainError> + Send,
    {
        let max_attempts = self.config.settlement.max_commit_attempts.max(1);
        let mut attempt = 1;
        loop {
            let expected = TaskGuard::observed(&current);
            let mut next = current.clone();
            apply(&mut next)?;

            let transition = TaskTransition {
                progress: ProgressEntry::record(
                    next.id(),
                    next.status(),
                    change.actor.clone(),
                    change.notes.clone(),
                    next.updated_at(),
                ),
                task: next,
                expected,
                count_cancellation_for: change.count_cancellation.then(|| change.actor.clone()),
                count_completion_for: change.count_completion.then(|| change.actor.clone()),
            };
            match self.tasks.commit_transition(&transition).await {
                Ok(receipt) => {
                    return Ok(Committed {
                        task: transition.task,
                        receipt,
                    });
                }
                Err(TaskRepositoryError::Conflict { current: latest, .. })
                    if attempt < max_attempts =>
                {
                    debug!(
                        task_id = %transition.task.id(),
                        attempt,
                        observed = %latest.status(),
                        "task changed concurrently, re-validating"
                    );
                    current = *latest;
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Binds the task's two parties to their chat thread.
    pub(super) async fn bind_chat(&self, task: &Task) {
        let Some(performer) = task.accepted_by() else {
            return;
        };
        let task_id = task.id();
        let bound = retry_side_effect("chat.resolve", self.config.side_effects, || {
            self.chat.resolve(task.created_by(), performer, Some(task_id))
        })
        .await;
        if let Err(exhausted) = bound {
            let effect = PendingEffect::BindChat {
                creator: task.created_by().clone(),
                performer: performer.clone(),
                task_id,
            };
            let outbox = self.notifications.outbox();
            defer(outbox, effect, exhausted.attempts, &exhausted, self.clock.utc()).await;
        }
    }

    /// Replays every side effect deferred to the outbox, once each.
    ///
    /// Notifications are replayed by the fan-out; chat bindings here.
    /// Entries that fail again stay queued for the next drain.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::StoreUnavailable`] when the outbox
    /// cannot be read or updated.
    pub async fn redeliver_pending(&self) -> TaskLifecycleResult<Redelivery> {
        let mut report = self.notifications.redeliver_pending().await?;
        let outbox = self.notifications.outbox();
        for entry in outbox.pending().await? {
            let PendingEffect::BindChat {
                creator,
                performer,
                task_id,
            } = &entry.effect
            else {
                continue;
            };
            let outcome = self
                .chat
                .resolve(creator, performer, Some(*task_id))
                .await
                .map(drop)
                .map_err(|err| err.to_string());
            settle(outbox, &entry, outcome, self.clock.utc(), &mut report).await?;
        }
        info!(
            delivered = report.delivered,
            still_pending = report.still_pending,
            "outbox drained"
        );
        Ok(report)
    }

    /// Emits one notification about `task_id`.
    pub(super) async fn notify(
        &self,
        recipient: &UserId,
        kind: NotificationKind,
        context: CopyContext,
        task_id: TaskId,
    ) {
        self.notifications
            .notify(NotificationRequest::about_task(
                recipient.clone(),
                kind,
                context,
                task_id,
            ))
            .await;
    }
}
