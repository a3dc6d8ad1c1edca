//! Completion settlement and its recovery path.
//!
//! The price moves before the `completed` status is written, under the
//! idempotency key `settlement:<task_id>`. A failed status write therefore
//! leaves at most a settled-but-not-completed task, which a retried
//! completion (the transfer replays) or [`TaskLifecycleService::reconcile_settlement`]
//! repairs. A completion that loses to a concurrent cancellation is refunded
//! under `settlement-reversal:<task_id>`.

use super::error::{TaskLifecycleError, TaskLifecycleResult};
use super::lifecycle::{ChangeRecord, Committed, TaskLifecycleService};
use crate::chat::ports::ChatRepository;
use crate::identity::UserId;
use crate::notification::{
    domain::{CopyContext, NotificationKind},
    ports::{NotificationRepository, PushGateway},
};
use crate::outbox::ports::Outbox;
use crate::task::{
    domain::{Task, TaskId, TaskStatus},
    ports::{ProgressLog, TaskRepository},
};
use crate::wallet::{
    domain::IdempotencyKey,
    ports::WalletLedger,
    services::TransferReceipt,
};
use mockable::Clock;
use tracing::{error, info, warn};

/// Ledger memo on settlement transfers.
pub const SETTLEMENT_MEMO: &str = "payment for task";

/// Ledger memo on settlement refunds.
pub const REVERSAL_MEMO: &str = "refund for task";

/// Idempotency key of a task's settlement transfer.
#[must_use]
pub fn settlement_key(task_id: TaskId) -> IdempotencyKey {
    IdempotencyKey::new(format!("settlement:{task_id}"))
}

/// Idempotency key of a task's settlement refund.
#[must_use]
pub fn reversal_key(task_id: TaskId) -> IdempotencyKey {
    IdempotencyKey::new(format!("settlement-reversal:{task_id}"))
}

/// What [`TaskLifecycleService::reconcile_settlement`] found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Status and ledger already agree.
    Consistent,
    /// A completed task had not been paid; the transfer was made.
    Paid(TransferReceipt),
    /// A cancelled task had been paid; the money was returned.
    Refunded(TransferReceipt),
    /// The task is paid but still in flight; retry the completion.
    AwaitingCompletion,
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
    /// Completes a task: pays the performer, then commits `completed`.
    ///
    /// Nothing is written when a guard fails or the creator cannot cover
    /// the price. After the commit the performer is told they were paid,
    /// the creator that the task is done, and a first-ever completion earns
    /// the performer an achievement notification.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::InsufficientFunds`] (for the creator's
    /// wallet) when the price cannot be covered, the guard errors of
    /// [`Self::advance`], and [`TaskLifecycleError::SettlementConflict`]
    /// when a lost race left money that could not be refunded.
    pub async fn complete(
        &self,
        task_id: TaskId,
        actor: &UserId,
        notes: Option<String>,
    ) -> TaskLifecycleResult<Task> {
        let current = self.get_task(task_id).await?;
        let mut dry_run = current.clone();
        dry_run.advance(actor, TaskStatus::Completed, &*self.clock)?;

        let settlement = self.settle(&current, actor).await?;
        let change = ChangeRecord {
            actor,
            notes,
            count_cancellation: false,
            count_completion: true,
        };
        let committed = self
            .commit_change(current, change, |task| {
                task.advance(actor, TaskStatus::Completed, &*self.clock)
            })
            .await;

        let Committed { task, receipt } = match committed {
            Ok(committed) => committed,
            Err(err) => {
                return Err(match settlement {
                    Some(_) if !err.is_retryable() => self.compensate(task_id, actor, err).await,
                    _ => err,
                });
            }
        };
        info!(
            task_id = %task_id,
            performer = %actor,
            price = %task.price(),
            paid = settlement.is_some(),
            "task completed"
        );

        let first_completion = receipt.completion_count == Some(1);
        self.announce_completion(&task, actor, settlement.is_some(), first_completion)
            .await;
        Ok(task)
    }

    /// Repairs a task whose status and settlement disagree.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for unknown tasks, wallet
    /// errors from the repair transfer, or
    /// [`TaskLifecycleError::StoreUnavailable`].
    pub async fn reconcile_settlement(&self, task_id: TaskId) -> TaskLifecycleResult<Reconciliation> {
        let task = self.get_task(task_id).await?;
        let Some(performer) = task.accepted_by().cloned() else {
            return Ok(Reconciliation::Consistent);
        };
        if !task.price().is_positive() {
            return Ok(Reconciliation::Consistent);
        }

        let settled = self.wallet.find_transfer(&settlement_key(task_id)).await?;
        let reversed = self.wallet.find_transfer(&reversal_key(task_id)).await?;
        let outcome = match (task.status(), settled, reversed) {
            (TaskStatus::Completed, None, _) => {
                let receipt = self
                    .wallet
                    .transfer_once(
                        settlement_key(task_id),
                        task.created_by(),
                        &performer,
                        task.price(),
                        task_id,
                        SETTLEMENT_MEMO,
                    )
                    .await?;
                Reconciliation::Paid(receipt)
            }
            (TaskStatus::Cancelled, Some(_), None) => {
                Reconciliation::Refunded(self.refund(&task, &performer).await?)
            }
            (status, Some(_), None) if status.is_in_flight() => Reconciliation::AwaitingCompletion,
            _ => Reconciliation::Consistent,
        };
        if outcome != Reconciliation::Consistent {
            info!(task_id = %task_id, outcome = ?outcome, "settlement reconciled");
        }
        Ok(outcome)
    }

    /// Transfers the price from creator to performer, exactly once per task.
    ///
    /// Returns `None` for free tasks.
    async fn settle(
        &self,
        task: &Task,
        performer: &UserId,
    ) -> TaskLifecycleResult<Option<TransferReceipt>> {
        if !task.price().is_positive() {
            return Ok(None);
        }
        let receipt = self
            .wallet
            .transfer_once(
                settlement_key(task.id()),
                task.created_by(),
                performer,
                task.price(),
                task.id(),
                SETTLEMENT_MEMO,
            )
            .await
            .inspect_err(|err| {
                warn!(task_id = %task.id(), error = %err, "settlement transfer rejected");
            })?;
        Ok(Some(receipt))
    }

    /// Refunds the settlement when a completion lost its race to a
    /// cancellation and passes the original error through. Reports a
    /// conflict when the refund itself fails.
    async fn compensate(
        &self,
        task_id: TaskId,
        performer: &UserId,
        cause: TaskLifecycleError,
    ) -> TaskLifecycleError {
        let latest = match self.get_task(task_id).await {
            Ok(latest) if latest.status() == TaskStatus::Cancelled => latest,
            Ok(_) => return cause,
            Err(err) => {
                error!(task_id = %task_id, cause = %cause, error = %err, "could not reload task after a lost completion");
                return TaskLifecycleError::SettlementConflict(task_id);
            }
        };
        match self.refund(&latest, performer).await {
            Ok(_) => {
                warn!(task_id = %task_id, cause = %cause, "completion lost to a cancellation; settlement refunded");
                cause
            }
            Err(err) => {
                error!(
                    task_id = %task_id,
                    cause = %cause,
                    error = %err,
                    "settlement refund failed; task needs reconciliation"
                );
                TaskLifecycleError::SettlementConflict(task_id)
            }
        }
    }

    async fn refund(&self, task: &Task, performer: &UserId) -> TaskLifecycleResult<TransferReceipt> {
        Ok(self
            .wallet
            .transfer_once(
                reversal_key(task.id()),
                performer,
                task.created_by(),
                task.price(),
                task.id(),
                REVERSAL_MEMO,
            )
            .await?)
    }

    async fn announce_completion(
        &self,
        task: &Task,
        performer: &UserId,
        paid: bool,
        first_completion: bool,
    ) {
        let task_id = task.id();
        if paid {
            self.notify(
                performer,
                NotificationKind::PaymentReceived,
                CopyContext::for_task(task.title()).amount(task.price()),
                task_id,
            )
            .await;
        }
        self.notify(
            task.created_by(),
            NotificationKind::TaskCompleted,
            CopyContext::for_task(task.title()).actor(performer),
            task_id,
        )
        .await;

        if first_completion {
            self.notify(
                performer,
                NotificationKind::Achievement,
                CopyContext::for_task(task.title()),
                task_id,
            )
            .await;
        }
    }
}
