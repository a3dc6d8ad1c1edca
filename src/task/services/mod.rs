//! Application services for task lifecycle orchestration.

mod cancellation;
mod error;
mod lifecycle;
mod settlement;

pub use cancellation::{
    CANCELLATION_FEE_DESCRIPTION, CancellationOutcome, FeeOutcome, cancellation_fee,
};
pub use error::{ErrorKind, TaskLifecycleError, TaskLifecycleResult};
pub use lifecycle::TaskLifecycleService;
pub use settlement::{
    REVERSAL_MEMO, Reconciliation, SETTLEMENT_MEMO, reversal_key, settlement_key,
};
