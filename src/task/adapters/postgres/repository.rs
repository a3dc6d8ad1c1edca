//! `PostgreSQL` repository implementation for task lifecycle storage.

use super::{
    models::{
        NewCompletionCounterRow, NewCounterRow, NewProgressRow, ProgressRow, TaskDetailsChangeset, TaskRow,
        TaskTransitionChangeset,
    },
    schema::{cancellation_counters, completion_counters, task_progress, tasks},
};
use crate::identity::UserId;
use crate::live::{Subscription, poll_subscription};
use crate::postgres::{BlockingError, PgPool, run_blocking};
use crate::task::{
    domain::{
        PersistedTaskData, ProgressEntry, ProgressEntryId, Task, TaskDetails, TaskFilter, TaskId,
        TaskStatus,
    },
    ports::{
        ProgressLog, TaskGuard, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
        TaskTransition, TransitionReceipt,
    },
};
use crate::wallet::domain::Money;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::time::Duration;

/// Default refresh period for live queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `PostgreSQL`-backed task store and progress log.
///
/// Transitions are conditional `UPDATE`s on the task's status and performer;
/// the progress insert and the counter upserts share the same database
/// transaction. Live queries poll at a fixed interval.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
    poll_interval: Duration,
}

impl PostgresTaskRepository {
    /// Creates a repository from a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the live query refresh period.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl From<BlockingError> for TaskRepositoryError {
    fn from(err: BlockingError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let row = to_row(task);
        run_blocking(&self.pool, move |connection| -> TaskRepositoryResult<()> {
            diesel::insert_into(tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    other => TaskRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        run_blocking(&self.pool, move |connection| load_task(connection, id)).await
    }

    async fn update_details(&self, task: &Task, expected: &TaskGuard) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let details = task.details();
        let changes = TaskDetailsChangeset {
            title: details.title.clone(),
            description: details.description.clone(),
            category: details.category.clone(),
            location: details.location.clone(),
            price_cents: details.price.cents(),
            estimated_time: details.estimated_time.clone(),
            updated_at: task.updated_at(),
        };
        let expected = expected.clone();
        run_blocking(&self.pool, move |connection| -> TaskRepositoryResult<()> {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                let updated = diesel::update(
                    tasks::table
                        .find(task_id.into_inner())
                        .filter(tasks::status.eq(expected.status.as_str()))
                        .filter(tasks::accepted_by.is_not_distinct_from(guard_performer(&expected))),
                )
                .set(&changes)
                .execute(tx)?;
                if updated == 0 {
                    return Err(conflict_or_missing(tx, task_id));
                }
                Ok(())
            })
        })
        .await
    }

    async fn commit_transition(
        &self,
        transition: &TaskTransition,
    ) -> TaskRepositoryResult<TransitionReceipt> {
        let transition = transition.clone();
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                commit_in_transaction(tx, &transition)
            })
        })
        .await
    }

    async fn query(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let filter = filter.clone();
        run_blocking(&self.pool, move |connection| -> TaskRepositoryResult<Vec<Task>> {
            let mut query = tasks::table.select(TaskRow::as_select()).into_boxed();
            if !filter.statuses.is_empty() {
                let statuses: Vec<&'static str> =
                    filter.statuses.iter().map(|status| status.as_str()).collect();
                query = query.filter(tasks::status.eq_any(statuses));
            }
            if let Some(creator) = &filter.created_by {
                query = query.filter(tasks::created_by.eq(creator.as_str().to_owned()));
            }
            if let Some(performer) = &filter.accepted_by {
                query = query.filter(tasks::accepted_by.eq(performer.as_str().to_owned()));
            }
            if let Some(category) = &filter.category {
                query = query.filter(tasks::category.eq(category.clone()));
            }
            query
                .order((tasks::created_at.desc(), tasks::id.asc()))
                .load::<TaskRow>(connection)?
                .into_iter()
                .map(row_to_task)
                .collect()
        })
        .await
    }

    async fn subscribe(&self, filter: TaskFilter) -> TaskRepositoryResult<Subscription<Task>> {
        let repository = self.clone();
        Ok(poll_subscription(self.poll_interval, move || {
            let repository = repository.clone();
            let filter = filter.clone();
            async move { repository.query(&filter).await }
        }))
    }

    async fn cancellation_count(&self, user: &UserId) -> TaskRepositoryResult<u32> {
        let user = user.as_str().to_owned();
        run_blocking(&self.pool, move |connection| -> TaskRepositoryResult<u32> {
            let count = cancellation_counters::table
                .find(user.as_str())
                .select(cancellation_counters::count)
                .first::<i32>(connection)
                .optional()?
                .unwrap_or(0);
            u32::try_from(count).map_err(TaskRepositoryError::persistence)
        })
        .await
    }

    async fn count_completed_by(&self, user: &UserId) -> TaskRepositoryResult<u64> {
        let user = user.as_str().to_owned();
        run_blocking(&self.pool, move |connection| -> TaskRepositoryResult<u64> {
            let count = completion_counters::table
                .find(user.as_str())
                .select(completion_counters::count)
                .first::<i64>(connection)
                .optional()?
                .unwrap_or(0);
            u64::try_from(count).map_err(TaskRepositoryError::persistence)
        })
        .await
    }
}

#[async_trait]
impl ProgressLog for PostgresTaskRepository {
    async fn append(&self, entry: &ProgressEntry) -> TaskRepositoryResult<ProgressEntryId> {
        let row = to_progress_row(entry);
        let entry_id = entry.id;
        run_blocking(&self.pool, move |connection| -> TaskRepositoryResult<ProgressEntryId> {
            diesel::insert_into(task_progress::table)
                .values(&row)
                .execute(connection)?;
            Ok(entry_id)
        })
        .await
    }

    async fn list_for(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<ProgressEntry>> {
        run_blocking(&self.pool, move |connection| load_progress(connection, task_id)).await
    }

    async fn subscribe(
        &self,
        task_id: TaskId,
    ) -> TaskRepositoryResult<Subscription<ProgressEntry>> {
        let pool = self.pool.clone();
        Ok(poll_subscription(self.poll_interval, move || {
            let pool = pool.clone();
            async move {
                run_blocking(&pool, move |connection| load_progress(connection, task_id)).await
            }
        }))
    }
}

fn commit_in_transaction(
    tx: &mut PgConnection,
    transition: &TaskTransition,
) -> TaskRepositoryResult<TransitionReceipt> {
    let task = &transition.task;
    let task_id = task.id();
    let changes = TaskTransitionChangeset {
        accepted_by: task.accepted_by().map(|user| user.as_str().to_owned()),
        status: task.status().as_str().to_owned(),
        updated_at: task.updated_at(),
        completed_at: task.completed_at(),
        cancelled_at: task.cancelled_at(),
        cancellation_reason: task.cancellation_reason().map(str::to_owned),
    };

    let updated = diesel::update(
        tasks::table
            .find(task_id.into_inner())
            .filter(tasks::status.eq(transition.expected.status.as_str()))
            .filter(tasks::accepted_by.is_not_distinct_from(guard_performer(&transition.expected))),
    )
    .set(&changes)
    .execute(tx)?;
    if updated == 0 {
        return Err(conflict_or_missing(tx, task_id));
    }

    diesel::insert_into(task_progress::table)
        .values(to_progress_row(&transition.progress))
        .execute(tx)?;

    let cancellation_count = match &transition.count_cancellation_for {
        Some(user) => Some(increment_cancellations(tx, user, task.updated_at())?),
        None => None,
    };
    let completion_count = match &transition.count_completion_for {
        Some(user) => Some(increment_completions(tx, user, task.updated_at())?),
        None => None,
    };
    Ok(TransitionReceipt {
        cancellation_count,
        completion_count,
    })
}

fn increment_cancellations(
    tx: &mut PgConnection,
    user: &UserId,
    at: chrono::DateTime<chrono::Utc>,
) -> TaskRepositoryResult<u32> {
    let count = diesel::insert_into(cancellation_counters::table)
        .values(NewCounterRow {
            user_id: user.as_str().to_owned(),
            count: 1,
            updated_at: at,
        })
        .on_conflict(cancellation_counters::user_id)
        .do_update()
        .set((
            cancellation_counters::count.eq(cancellation_counters::count + 1),
            cancellation_counters::updated_at.eq(at),
        ))
        .returning(cancellation_counters::count)
        .get_result::<i32>(tx)?;
    u32::try_from(count).map_err(TaskRepositoryError::persistence)
}

fn increment_completions(
    tx: &mut PgConnection,
    user: &UserId,
    at: chrono::DateTime<chrono::Utc>,
) -> TaskRepositoryResult<u64> {
    let count = diesel::insert_into(completion_counters::table)
        .values(NewCompletionCounterRow {
            user_id: user.as_str().to_owned(),
            count: 1,
            updated_at: at,
        })
        .on_conflict(completion_counters::user_id)
        .do_update()
        .set((
            completion_counters::count.eq(completion_counters::count + 1),
            completion_counters::updated_at.eq(at),
        ))
        .returning(completion_counters::count)
        .get_result::<i64>(tx)?;
    u64::try_from(count).map_err(TaskRepositoryError::persistence)
}

fn guard_performer(guard: &TaskGuard) -> Option<String> {
    guard
        .accepted_by
        .as_ref()
        .map(|user| user.as_str().to_owned())
}

fn conflict_or_missing(connection: &mut PgConnection, task_id: TaskId) -> TaskRepositoryError {
    match load_task(connection, task_id) {
        Ok(Some(current)) => TaskRepositoryError::Conflict {
            task_id,
            current: Box::new(current),
        },
        Ok(None) => TaskRepositoryError::NotFound(task_id),
        Err(err) => err,
    }
}

fn load_task(connection: &mut PgConnection, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
    tasks::table
        .find(id.into_inner())
        .select(TaskRow::as_select())
        .first::<TaskRow>(connection)
        .optional()?
        .map(row_to_task)
        .transpose()
}

fn load_progress(
    connection: &mut PgConnection,
    task_id: TaskId,
) -> TaskRepositoryResult<Vec<ProgressEntry>> {
    task_progress::table
        .filter(task_progress::task_id.eq(task_id.into_inner()))
        .order((task_progress::created_at.asc(), task_progress::seq.asc()))
        .select(ProgressRow::as_select())
        .load::<ProgressRow>(connection)?
        .into_iter()
        .map(row_to_progress)
        .collect()
}

fn to_row(task: &Task) -> TaskRow {
    let details = task.details();
    TaskRow {
        id: task.id().into_inner(),
        title: details.title.clone(),
        description: details.description.clone(),
        category: details.category.clone(),
        location: details.location.clone(),
        price_cents: details.price.cents(),
        estimated_time: details.estimated_time.clone(),
        created_by: task.created_by().as_str().to_owned(),
        accepted_by: task.accepted_by().map(|user| user.as_str().to_owned()),
        status: task.status().as_str().to_owned(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        completed_at: task.completed_at(),
        cancelled_at: task.cancelled_at(),
        cancellation_reason: task.cancellation_reason().map(str::to_owned),
    }
}

fn to_progress_row(entry: &ProgressEntry) -> NewProgressRow {
    NewProgressRow {
        id: entry.id.into_inner(),
        task_id: entry.task_id.into_inner(),
        status: entry.status.as_str().to_owned(),
        notes: entry.notes.clone(),
        actor_id: entry.actor_id.as_str().to_owned(),
        created_at: entry.created_at,
    }
}

fn parse_user(value: String) -> TaskRepositoryResult<UserId> {
    UserId::new(value).map_err(TaskRepositoryError::persistence)
}

fn parse_status(value: &str) -> TaskRepositoryResult<TaskStatus> {
    TaskStatus::try_from(value).map_err(TaskRepositoryError::persistence)
}

pub(super) fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        title,
        description,
        category,
        location,
        price_cents,
        estimated_time,
        created_by,
        accepted_by,
        status,
        created_at,
        updated_at,
        completed_at,
        cancelled_at,
        cancellation_reason,
    } = row;

    let data = PersistedTaskData {
        id: TaskId::from_uuid(id),
        details: TaskDetails {
            title,
            description,
            category,
            location,
            price: Money::from_cents(price_cents),
            estimated_time,
        },
        created_by: parse_user(created_by)?,
        accepted_by: accepted_by.map(parse_user).transpose()?,
        status: parse_status(&status)?,
        created_at,
        updated_at,
        completed_at,
        cancelled_at,
        cancellation_reason,
    };
    Ok(Task::from_persisted(data))
}

pub(super) fn row_to_progress(row: ProgressRow) -> TaskRepositoryResult<ProgressEntry> {
    Ok(ProgressEntry {
        id: ProgressEntryId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        status: parse_status(&row.status)?,
        notes: row.notes,
        actor_id: parse_user(row.actor_id)?,
        created_at: row.created_at,
    })
}
