//! `PostgreSQL` outbox.

use super::{models::OutboxRow, schema::outbox_entries};
use crate::outbox::{
    domain::{OutboxEntry, OutboxEntryId, PendingEffect},
    ports::{Outbox, OutboxError, OutboxResult},
};
use crate::postgres::{BlockingError, PgPool, run_blocking};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;

/// `PostgreSQL`-backed outbox storing each effect as a `jsonb` payload.
#[derive(Debug, Clone)]
pub struct PostgresOutbox {
    pool: PgPool,
}

impl PostgresOutbox {
    /// Creates an outbox from a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<diesel::result::Error> for OutboxError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

impl From<BlockingError> for OutboxError {
    fn from(err: BlockingError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl Outbox for PostgresOutbox {
    async fn enqueue(&self, entry: &OutboxEntry) -> OutboxResult<()> {
        let row = to_row(entry)?;
        run_blocking(&self.pool, move |conn| {
            diesel::insert_into(outbox_entries::table)
                .values(&row)
                .on_conflict(outbox_entries::id)
                .do_nothing()
                .execute(conn)
                .map_err(OutboxError::from)
        })
        .await?;
        Ok(())
    }

    async fn pending(&self) -> OutboxResult<Vec<OutboxEntry>> {
        let rows = run_blocking(&self.pool, |conn| {
            outbox_entries::table
                .order(outbox_entries::seq.asc())
                .select(OutboxRow::as_select())
                .load(conn)
                .map_err(OutboxError::from)
        })
        .await?;
        rows.into_iter().map(row_to_entry).collect()
    }

    async fn acknowledge(&self, id: OutboxEntryId) -> OutboxResult<()> {
        run_blocking(&self.pool, move |conn| {
            diesel::delete(outbox_entries::table.find(id.into_inner()))
                .execute(conn)
                .map_err(OutboxError::from)
        })
        .await?;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: OutboxEntryId,
        error: &str,
        at: DateTime<Utc>,
    ) -> OutboxResult<()> {
        let error = error.to_owned();
        run_blocking(&self.pool, move |conn| {
            diesel::update(outbox_entries::table.find(id.into_inner()))
                .set((
                    outbox_entries::attempts.eq(outbox_entries::attempts + 1),
                    outbox_entries::last_error.eq(error),
                    outbox_entries::updated_at.eq(at),
                ))
                .execute(conn)
                .map_err(OutboxError::from)
        })
        .await?;
        Ok(())
    }
}

pub(super) fn to_row(entry: &OutboxEntry) -> OutboxResult<OutboxRow> {
    let payload = entry
        .effect
        .to_payload()
        .map_err(|err| OutboxError::Payload {
            id: entry.id,
            source: Arc::new(err),
        })?;
    Ok(OutboxRow {
        id: entry.id.into_inner(),
        effect: entry.effect.name().to_owned(),
        payload,
        attempts: i32::try_from(entry.attempts).unwrap_or(i32::MAX),
        last_error: entry.last_error.clone(),
        enqueued_at: entry.enqueued_at,
        updated_at: entry.updated_at,
    })
}

pub(super) fn row_to_entry(row: OutboxRow) -> OutboxResult<OutboxEntry> {
    let id = OutboxEntryId::from_uuid(row.id);
    let effect = PendingEffect::from_payload(row.payload).map_err(|err| OutboxError::Payload {
        id,
        source: Arc::new(err),
    })?;
    Ok(OutboxEntry {
        id,
        effect,
        attempts: u32::try_from(row.attempts).unwrap_or_default(),
        last_error: row.last_error,
        enqueued_at: row.enqueued_at,
        updated_at: row.updated_at,
    })
}
