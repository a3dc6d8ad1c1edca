//! Orchestrator errors and their caller-facing kinds.

use crate::identity::UserId;
use crate::outbox::ports::OutboxError;
use crate::task::domain::{TaskDomainError, TaskId, TaskStatus};
use crate::task::ports::TaskRepositoryError;
use crate::wallet::domain::{Money, WalletDomainError};
use crate::wallet::services::WalletError;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by [`super::TaskLifecycleService`].
///
/// Guard violations are raised before anything is written.
#[derive(Debug, Clone, Error)]
pub enum TaskLifecycleError {
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// A wallet amount was zero or negative.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Money),

    /// A wallet could not cover a debit.
    #[error("{user_id} has {balance} but {requested} is required")]
    InsufficientFunds {
        /// Wallet owner.
        user_id: UserId,
        /// Balance at the time of the attempt.
        balance: Money,
        /// Amount requested.
        requested: Money,
    },

    /// The creator tried to accept their own task.
    #[error("task {0} cannot be accepted by its creator")]
    SelfAcceptance(TaskId),

    /// The task is no longer open.
    #[error("task {task_id} is already {status}")]
    AlreadyAccepted {
        /// Task that was targeted.
        task_id: TaskId,
        /// Status observed at the time of the attempt.
        status: TaskStatus,
    },

    /// Only the performer may advance the task.
    #[error("only the performer may update task {0}")]
    NotPerformer(TaskId),

    /// The actor is neither creator nor performer.
    #[error("actor is not a party to task {0}")]
    NotParticipant(TaskId),

    /// The requested status is not reachable.
    #[error("invalid task transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// A cancellation needs a reason.
    #[error("a cancellation reason is required")]
    MissingReason,

    /// Task input was rejected.
    #[error("invalid task: {0}")]
    Validation(TaskDomainError),

    /// Money moved for a completion that then lost a race and could not be
    /// refunded automatically. `reconcile_settlement` repairs the task.
    #[error("settlement for task {0} needs reconciliation")]
    SettlementConflict(TaskId),

    /// A store failed or stayed contended; the caller may retry.
    #[error("store unavailable: {0}")]
    StoreUnavailable(Arc<dyn std::error::Error + Send + Sync>),
}

/// Fieldless classification of [`TaskLifecycleError`] for callers that
/// branch on the failure rather than display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`TaskLifecycleError::NotFound`].
    NotFound,
    /// See [`TaskLifecycleError::InvalidAmount`].
    InvalidAmount,
    /// See [`TaskLifecycleError::InsufficientFunds`].
    InsufficientFunds,
    /// See [`TaskLifecycleError::SelfAcceptance`].
    SelfAcceptance,
    /// See [`TaskLifecycleError::AlreadyAccepted`].
    AlreadyAccepted,
    /// See [`TaskLifecycleError::NotPerformer`].
    NotPerformer,
    /// See [`TaskLifecycleError::NotParticipant`].
    NotParticipant,
    /// See [`TaskLifecycleError::InvalidTransition`].
    InvalidTransition,
    /// See [`TaskLifecycleError::MissingReason`].
    MissingReason,
    /// See [`TaskLifecycleError::Validation`].
    Validation,
    /// See [`TaskLifecycleError::SettlementConflict`].
    SettlementConflict,
    /// See [`TaskLifecycleError::StoreUnavailable`].
    StoreUnavailable,
}

impl ErrorKind {
    /// Returns `true` when retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

impl TaskLifecycleError {
    /// Returns the error's kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::SelfAcceptance(_) => ErrorKind::SelfAcceptance,
            Self::AlreadyAccepted { .. } => ErrorKind::AlreadyAccepted,
            Self::NotPerformer(_) => ErrorKind::NotPerformer,
            Self::NotParticipant(_) => ErrorKind::NotParticipant,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::MissingReason => ErrorKind::MissingReason,
            Self::Validation(_) => ErrorKind::Validation,
            Self::SettlementConflict(_) => ErrorKind::SettlementConflict,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// Returns `true` when retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<TaskDomainError> for TaskLifecycleError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::SelfAcceptance(id) => Self::SelfAcceptance(id),
            TaskDomainError::AlreadyAccepted { task_id, status } => {
                Self::AlreadyAccepted { task_id, status }
            }
            TaskDomainError::NotPerformer(id) => Self::NotPerformer(id),
            TaskDomainError::NotParticipant(id) => Self::NotParticipant(id),
            TaskDomainError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            TaskDomainError::MissingReason => Self::MissingReason,
            TaskDomainError::EmptyTitle | TaskDomainError::NegativePrice => Self::Validation(err),
        }
    }
}

impl From<TaskRepositoryError> for TaskLifecycleError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(id) => Self::NotFound(id),
            TaskRepositoryError::Persistence(source) => Self::StoreUnavailable(source),
            TaskRepositoryError::DuplicateTask(_) | TaskRepositoryError::Conflict { .. } => {
                Self::StoreUnavailable(Arc::new(err))
            }
        }
    }
}

impl From<WalletError> for TaskLifecycleError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Domain(WalletDomainError::InvalidAmount(amount)) => {
                Self::InvalidAmount(amount)
            }
            WalletError::Domain(WalletDomainError::InsufficientFunds {
                user_id,
                balance,
                requested,
            }) => Self::InsufficientFunds {
                user_id,
                balance,
                requested,
            },
            WalletError::StoreUnavailable(source) => Self::StoreUnavailable(source),
            other @ (WalletError::Domain(_) | WalletError::MismatchedReplay(_)) => {
                Self::StoreUnavailable(Arc::new(other))
            }
        }
    }
}

impl From<OutboxError> for TaskLifecycleError {
    fn from(err: OutboxError) -> Self {
        match err {
            OutboxError::Persistence(source) => Self::StoreUnavailable(source),
            other @ OutboxError::Payload { .. } => Self::StoreUnavailable(Arc::new(other)),
        }
    }
}

/// Result type for orchestrator operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;
