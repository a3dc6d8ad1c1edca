//! Writing exhausted effects to the outbox and settling replays.

use crate::outbox::{
    domain::{DeliveryStatus, OutboxEntry, PendingEffect, Redelivery},
    ports::{Outbox, OutboxResult},
};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use tracing::{error, info, warn};

/// Queues `effect` after its inline retries ran out.
///
/// Returns [`DeliveryStatus::Dropped`] only when the outbox write fails as
/// well.
pub async fn defer<O>(
    outbox: &O,
    effect: PendingEffect,
    attempts: u32,
    failure: impl Display,
    at: DateTime<Utc>,
) -> DeliveryStatus
where
    O: Outbox + ?Sized,
{
    let name = effect.name();
    let entry = OutboxEntry::defer(effect, attempts, failure, at);
    match outbox.enqueue(&entry).await {
        Ok(()) => {
            warn!(
                effect = name,
                entry_id = %entry.id,
                attempts,
                error = %entry.last_error,
                "side effect deferred to the outbox"
            );
            DeliveryStatus::Deferred(entry.id)
        }
        Err(err) => {
            error!(
                effect = name,
                attempts,
                error = %entry.last_error,
                outbox_error = %err,
                "side effect dropped"
            );
            DeliveryStatus::Dropped
        }
    }
}

/// Acknowledges or re-queues `entry` according to the replay outcome.
///
/// # Errors
///
/// Returns the outbox error when the acknowledgement or failure record
/// cannot be written.
pub async fn settle<O>(
    outbox: &O,
    entry: &OutboxEntry,
    outcome: Result<(), String>,
    at: DateTime<Utc>,
    report: &mut Redelivery,
) -> OutboxResult<()>
where
    O: Outbox + ?Sized,
{
    match outcome {
        Ok(()) => {
            outbox.acknowledge(entry.id).await?;
            report.delivered += 1;
            info!(
                effect = entry.effect.name(),
                entry_id = %entry.id,
                "deferred side effect delivered"
            );
        }
        Err(err) => {
            outbox.record_failure(entry.id, &err, at).await?;
            report.still_pending += 1;
            warn!(
                effect = entry.effect.name(),
                entry_id = %entry.id,
                attempts = entry.attempts.saturating_add(1),
                error = %err,
                "deferred side effect still failing"
            );
        }
    }
    Ok(())
}
