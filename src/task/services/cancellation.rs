//! Cancellation and the repeat-canceller fee.
//!
//! The cancellation commits first and bumps the actor's counter in the same
//! write. The fee is debited afterwards and is best-effort: a wallet that
//! cannot cover it leaves the fee uncollected rather than keeping the task
//! alive.

use super::error::TaskLifecycleResult;
use super::lifecycle::{ChangeRecord, Committed, TaskLifecycleService};
use crate::chat::ports::ChatRepository;
use crate::config::CancellationPolicy;
use crate::identity::UserId;
use crate::notification::{
    domain::{CopyContext, NotificationKind},
    ports::{NotificationRepository, PushGateway},
};
use crate::outbox::ports::Outbox;
use crate::task::{
    domain::{Task, TaskId},
    ports::{ProgressLog, TaskRepository},
};
use crate::wallet::{
    domain::{Money, TransactionId},
    ports::WalletLedger,
};
use mockable::Clock;
use tracing::{info, warn};

/// Ledger description on cancellation fee debits.
pub const CANCELLATION_FEE_DESCRIPTION: &str = "cancellation fee";

/// What happened to the cancellation fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeOutcome {
    /// The actor was within their free cancellations, or the task was free.
    NotApplicable,
    /// The fee was debited.
    Charged {
        /// Fee amount.
        amount: Money,
        /// Debit entry.
        transaction_id: TransactionId,
    },
    /// The fee was due but could not be debited.
    Uncollected {
        /// Fee amount.
        amount: Money,
        /// Why the debit failed.
        reason: String,
    },
}

/// Result of a committed cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// The cancelled task.
    pub task: Task,
    /// The actor's cancellation count including this one.
    pub cancellation_count: u32,
    /// Fee handling.
    pub fee: FeeOutcome,
}

/// Returns the fee owed for a cancellation, if any.
///
/// `count` includes the cancellation being charged. The first
/// `free_cancellations` are free; after that a priced task costs the larger
/// of `fee_percent` of its price and the minimum fee.
#[must_use]
pub fn cancellation_fee(policy: &CancellationPolicy, count: u32, price: Money) -> Option<Money> {
    if count <= policy.free_cancellations || !price.is_positive() {
        return None;
    }
    Some(price.percent(policy.fee_percent).max(Money::from_cents(policy.minimum_fee_cents)))
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
    /// Cancels a non-terminal task on behalf of either party.
    ///
    /// The counterparty, if any, is notified; a charged fee is announced to
    /// the actor.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskLifecycleError::NotParticipant`] for strangers,
    /// [`super::TaskLifecycleError::InvalidTransition`] for terminal tasks,
    /// and [`super::TaskLifecycleError::MissingReason`] for a blank reason.
    pub async fn cancel(
        &self,
        task_id: TaskId,
        actor: &UserId,
        reason: &str,
    ) -> TaskLifecycleResult<CancellationOutcome> {
        let current = self.get_task(task_id).await?;
        let change = ChangeRecord {
            actor,
            notes: Some(reason.trim().to_owned()),
            count_cancellation: true,
            count_completion: false,
        };
        let Committed { task, receipt } = self
            .commit_change(current, change, |task| {
                task.cancel(actor, reason, &*self.clock)
            })
            .await?;
        let cancellation_count = match receipt.cancellation_count {
            Some(count) => count,
            None => self.tasks.cancellation_count(actor).await?,
        };
        info!(
            task_id = %task_id,
            actor = %actor,
            cancellation_count,
            "task cancelled"
        );

        let fee = self.collect_fee(&task, actor, cancellation_count).await;

        if let Some(counterparty) = task.counterparty(actor) {
            self.notify(
                counterparty,
                NotificationKind::TaskCancelled,
                CopyContext::for_task(task.title())
                    .actor(actor)
                    .reason(task.cancellation_reason().unwrap_or(reason)),
                task_id,
            )
            .await;
        }
        if let FeeOutcome::Charged { amount, .. } = &fee {
            self.notify(
                actor,
                NotificationKind::CancellationFee,
                CopyContext::for_task(task.title()).amount(amount),
                task_id,
            )
            .await;
        }

        Ok(CancellationOutcome {
            task,
            cancellation_count,
            fee,
        })
    }

    async fn collect_fee(&self, task: &Task, actor: &UserId, count: u32) -> FeeOutcome {
        let Some(amount) = cancellation_fee(&self.config.cancellation, count, task.price()) else {
            return FeeOutcome::NotApplicable;
        };
        match self
            .wallet
            .debit(actor, amount, CANCELLATION_FEE_DESCRIPTION, Some(task.id()))
            .await
        {
            Ok(transaction_id) => {
                info!(task_id = %task.id(), actor = %actor, %amount, "cancellation fee charged");
                FeeOutcome::Charged {
                    amount,
                    transaction_id,
                }
            }
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    actor = %actor,
                    %amount,
                    error = %err,
                    "cancellation fee not collected"
                );
                FeeOutcome::Uncollected {
                    amount,
                    reason: err.to_string(),
                }
            }
        }
    }
}
