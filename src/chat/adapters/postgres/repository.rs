//! `PostgreSQL` chat repository.

use super::{
    models::{MessageRow, NewMessageRow, ThreadRow},
    schema::{chat_messages, chat_threads},
};
use crate::chat::{
    domain::{
        ChatMessage, ChatThread, MessageId, ParticipantPair, PersistedThreadData, ThreadId,
    },
    ports::{ChatRepository, ChatRepositoryError, ChatRepositoryResult},
};
use crate::identity::UserId;
use crate::postgres::{BlockingError, PgPool, run_blocking};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;

/// `PostgreSQL`-backed chat repository.
///
/// Threads carry a unique constraint on `(participant_low,
/// participant_high)`; first contact is an `INSERT … ON CONFLICT DO UPDATE`
/// so racing callers converge on one row.
#[derive(Debug, Clone)]
pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    /// Creates a repository from a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<diesel::result::Error> for ChatRepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

impl From<BlockingError> for ChatRepositoryError {
    fn from(err: BlockingError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn upsert_thread(
        &self,
        participants: &ParticipantPair,
        task_id: Option<TaskId>,
        at: DateTime<Utc>,
    ) -> ChatRepositoryResult<ChatThread> {
        let candidate = ChatThread::open(participants.clone(), task_id, at);
        let row = to_thread_row(&candidate);
        run_blocking(&self.pool, move |connection| -> ChatRepositoryResult<ChatThread> {
            let insert = diesel::insert_into(chat_threads::table)
                .values(&row)
                .on_conflict((chat_threads::participant_low, chat_threads::participant_high))
                .do_update();
            let stored = match task_id {
                Some(task_id) => insert
                    .set((
                        chat_threads::last_task_id.eq(task_id.into_inner()),
                        chat_threads::updated_at.eq(at),
                    ))
                    .returning(ThreadRow::as_returning())
                    .get_result::<ThreadRow>(connection)?,
                // A no-op assignment so RETURNING yields the existing row.
                None => insert
                    .set(chat_threads::participant_low.eq(excluded(chat_threads::participant_low)))
                    .returning(ThreadRow::as_returning())
                    .get_result::<ThreadRow>(connection)?,
            };
            row_to_thread(stored)
        })
        .await
    }

    async fn find_thread(&self, id: ThreadId) -> ChatRepositoryResult<Option<ChatThread>> {
        run_blocking(&self.pool, move |connection| -> ChatRepositoryResult<Option<ChatThread>> {
            chat_threads::table
                .find(id.into_inner())
                .select(ThreadRow::as_select())
                .first::<ThreadRow>(connection)
                .optional()?
                .map(row_to_thread)
                .transpose()
        })
        .await
    }

    async fn append_message(&self, message: &ChatMessage) -> ChatRepositoryResult<ChatThread> {
        let row = to_message_row(message);
        let summary = message.summary().to_owned();
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, ChatRepositoryError, _>(|tx| {
                let thread_id = row.thread_id;
                let updated = diesel::update(chat_threads::table.find(thread_id))
                    .set((
                        chat_threads::last_message.eq(Some(summary.as_str())),
                        chat_threads::last_message_time.eq(Some(row.created_at)),
                        chat_threads::updated_at.eq(row.created_at),
                    ))
                    .returning(ThreadRow::as_returning())
                    .get_result::<ThreadRow>(tx)
                    .optional()?
                    .ok_or_else(|| {
                        ChatRepositoryError::ThreadNotFound(ThreadId::from_uuid(thread_id))
                    })?;
                diesel::insert_into(chat_messages::table)
                    .values(&row)
                    .execute(tx)?;
                row_to_thread(updated)
            })
        })
        .await
    }

    async fn messages_in_thread(&self, id: ThreadId) -> ChatRepositoryResult<Vec<ChatMessage>> {
        run_blocking(&self.pool, move |connection| -> ChatRepositoryResult<Vec<ChatMessage>> {
            chat_messages::table
                .filter(chat_messages::thread_id.eq(id.into_inner()))
                .order(chat_messages::seq.asc())
                .select(MessageRow::as_select())
                .load::<MessageRow>(connection)?
                .into_iter()
                .map(row_to_message)
                .collect()
        })
        .await
    }

    async fn messages_for_task(&self, task_id: TaskId) -> ChatRepositoryResult<Vec<ChatMessage>> {
        run_blocking(&self.pool, move |connection| -> ChatRepositoryResult<Vec<ChatMessage>> {
            chat_messages::table
                .filter(chat_messages::task_id.eq(task_id.into_inner()))
                .order(chat_messages::seq.asc())
                .select(MessageRow::as_select())
                .load::<MessageRow>(connection)?
                .into_iter()
                .map(row_to_message)
                .collect()
        })
        .await
    }

    async fn threads_for_user(&self, user: &UserId) -> ChatRepositoryResult<Vec<ChatThread>> {
        let user = user.as_str().to_owned();
        run_blocking(&self.pool, move |connection| -> ChatRepositoryResult<Vec<ChatThread>> {
            chat_threads::table
                .filter(
                    chat_threads::participant_low
                        .eq(&user)
                        .or(chat_threads::participant_high.eq(&user)),
                )
                .order(chat_threads::updated_at.desc())
                .select(ThreadRow::as_select())
                .load::<ThreadRow>(connection)?
                .into_iter()
                .map(row_to_thread)
                .collect()
        })
        .await
    }
}

fn parse_user(value: String) -> ChatRepositoryResult<UserId> {
    UserId::new(value).map_err(ChatRepositoryError::persistence)
}

fn to_thread_row(thread: &ChatThread) -> ThreadRow {
    ThreadRow {
        id: thread.id().into_inner(),
        participant_low: thread.participants().low().as_str().to_owned(),
        participant_high: thread.participants().high().as_str().to_owned(),
        last_task_id: thread.last_task_id().map(TaskId::into_inner),
        last_message: thread.last_message().map(str::to_owned),
        last_message_time: thread.last_message_time(),
        created_at: thread.created_at(),
        updated_at: thread.updated_at(),
    }
}

fn to_message_row(message: &ChatMessage) -> NewMessageRow {
    NewMessageRow {
        id: message.id.into_inner(),
        thread_id: message.thread_id.into_inner(),
        sender_id: message.sender_id.as_str().to_owned(),
        recipient_id: message.recipient_id.as_str().to_owned(),
        content: message.content.clone(),
        attachment: message.attachment.clone(),
        task_id: message.task_id.map(TaskId::into_inner),
        created_at: message.created_at,
    }
}

pub(super) fn row_to_thread(row: ThreadRow) -> ChatRepositoryResult<ChatThread> {
    let participants = ParticipantPair::new(
        parse_user(row.participant_low)?,
        parse_user(row.participant_high)?,
    )
    .map_err(ChatRepositoryError::persistence)?;
    Ok(ChatThread::from_persisted(PersistedThreadData {
        id: ThreadId::from_uuid(row.id),
        participants,
        last_task_id: row.last_task_id.map(TaskId::from_uuid),
        last_message: row.last_message,
        last_message_time: row.last_message_time,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn row_to_message(row: MessageRow) -> ChatRepositoryResult<ChatMessage> {
    Ok(ChatMessage {
        id: MessageId::from_uuid(row.id),
        thread_id: ThreadId::from_uuid(row.thread_id),
        sender_id: parse_user(row.sender_id)?,
        recipient_id: parse_user(row.recipient_id)?,
        content: row.content,
        attachment: row.attachment,
        task_id: row.task_id.map(TaskId::from_uuid),
        created_at: row.created_at,
    })
}
