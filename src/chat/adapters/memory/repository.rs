//! In-memory chat repository.

use crate::chat::{
    domain::{ChatMessage, ChatThread, ParticipantPair, ThreadId},
    ports::{ChatRepository, ChatRepositoryError, ChatRepositoryResult},
};
use crate::identity::UserId;
use crate::task::domain::TaskId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory chat repository.
///
/// The pair index and the thread map change under one write lock, so the
/// find-or-create in [`ChatRepository::upsert_thread`] cannot race.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatRepository {
    state: Arc<RwLock<ChatState>>,
}

#[derive(Debug, Default)]
struct ChatState {
    threads: HashMap<ThreadId, ChatThread>,
    by_pair: HashMap<ParticipantPair, ThreadId>,
    messages: Vec<ChatMessage>,
}

impl InMemoryChatRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> ChatRepositoryError {
    ChatRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn upsert_thread(
        &self,
        participants: &ParticipantPair,
        task_id: Option<TaskId>,
        at: DateTime<Utc>,
    ) -> ChatRepositoryResult<ChatThread> {
        let mut guard = self.state.write().map_err(lock_error)?;
        let state = &mut *guard;
        if let Some(existing) = state
            .by_pair
            .get(participants)
            .and_then(|id| state.threads.get_mut(id))
        {
            if let Some(task_id) = task_id {
                existing.bind_task(task_id, at);
            }
            return Ok(existing.clone());
        }

        let thread = ChatThread::open(participants.clone(), task_id, at);
        state.by_pair.insert(participants.clone(), thread.id());
        state.threads.insert(thread.id(), thread.clone());
        Ok(thread)
    }

    async fn find_thread(&self, id: ThreadId) -> ChatRepositoryResult<Option<ChatThread>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.threads.get(&id).cloned())
    }

    async fn append_message(&self, message: &ChatMessage) -> ChatRepositoryResult<ChatThread> {
        let mut state = self.state.write().map_err(lock_error)?;
        let thread = state
            .threads
            .get_mut(&message.thread_id)
            .ok_or(ChatRepositoryError::ThreadNotFound(message.thread_id))?;
        thread.record_message(message);
        let updated = thread.clone();
        state.messages.push(message.clone());
        Ok(updated)
    }

    async fn messages_in_thread(&self, id: ThreadId) -> ChatRepositoryResult<Vec<ChatMessage>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .messages
            .iter()
            .filter(|message| message.thread_id == id)
            .cloned()
            .collect())
    }

    async fn messages_for_task(&self, task_id: TaskId) -> ChatRepositoryResult<Vec<ChatMessage>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .messages
            .iter()
            .filter(|message| message.task_id == Some(task_id))
            .cloned()
            .collect())
    }

    async fn threads_for_user(&self, user: &UserId) -> ChatRepositoryResult<Vec<ChatThread>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut threads: Vec<ChatThread> = state
            .threads
            .values()
            .filter(|thread| thread.participants().contains(user))
            .cloned()
            .collect();
        threads.sort_by(|left, right| right.updated_at().cmp(&left.updated_at()));
        Ok(threads)
    }
}
