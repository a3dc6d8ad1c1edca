//! Chat thread resolution and messaging.

use crate::chat::{
    domain::{ChatDomainError, ChatMessage, ChatThread, MessageId, ParticipantPair, ThreadId},
    ports::{ChatRepository, ChatRepositoryError},
};
use crate::identity::UserId;
use crate::task::domain::TaskId;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Service-level chat errors.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// A chat rule rejected the request.
    #[error(transparent)]
    Domain(#[from] ChatDomainError),

    /// The thread does not exist.
    #[error("chat thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// The backing store failed; the caller may retry.
    #[error("chat store unavailable: {0}")]
    StoreUnavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl From<ChatRepositoryError> for ChatError {
    fn from(err: ChatRepositoryError) -> Self {
        match err {
            ChatRepositoryError::ThreadNotFound(id) => Self::ThreadNotFound(id),
            ChatRepositoryError::Persistence(source) => Self::StoreUnavailable(source),
        }
    }
}

/// Result type for chat service operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Input for [`ChatService::post_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMessage {
    /// Target thread.
    pub thread_id: ThreadId,
    /// Author.
    pub sender_id: UserId,
    /// Other participant.
    pub recipient_id: UserId,
    /// Text; may be empty when an attachment is given.
    pub content: String,
    /// Opaque media reference.
    pub attachment: Option<String>,
    /// Task the message is about.
    pub task_id: Option<TaskId>,
}

impl PostMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(
        thread_id: ThreadId,
        sender_id: UserId,
        recipient_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self {
            thread_id,
            sender_id,
            recipient_id,
            content: content.into(),
            attachment: None,
            task_id: None,
        }
    }

    /// Attaches a media reference.
    #[must_use]
    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }

    /// Tags the message with a task.
    #[must_use]
    pub const fn about_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }
}

/// Chat thread resolver and message log.
#[derive(Clone)]
pub struct ChatService<R, C>
where
    R: ChatRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> ChatService<R, C>
where
    R: ChatRepository,
    C: Clock + Send + Sync,
{
    /// Creates a chat service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Returns the single thread between `first` and `second`, creating it
    /// on first contact. A given `task_id` becomes the thread's latest task.
    ///
    /// # Errors
    ///
    /// Returns [`ChatDomainError::SameParticipant`] when both users are the
    /// same, or [`ChatError::StoreUnavailable`].
    pub async fn resolve(
        &self,
        first: &UserId,
        second: &UserId,
        task_id: Option<TaskId>,
    ) -> ChatResult<ThreadId> {
        let pair = ParticipantPair::new(first.clone(), second.clone())?;
        let thread = self
            .repository
            .upsert_thread(&pair, task_id, self.clock.utc())
            .await?;
        debug!(thread_id = %thread.id(), low = %pair.low(), high = %pair.high(), "chat thread resolved");
        Ok(thread.id())
    }

    /// Appends a message and refreshes the thread summary.
    ///
    /// A message tagged with a task is also returned by
    /// [`ChatService::messages_for_task`].
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ThreadNotFound`], a
    /// [`ChatDomainError::NotThreadParticipant`] when sender and recipient
    /// are not exactly the thread's pair, or [`ChatDomainError::EmptyMessage`].
    pub async fn post_message(&self, request: PostMessage) -> ChatResult<MessageId> {
        let thread = self.thread(request.thread_id).await?;
        let pair = thread.participants();
        for user in [&request.sender_id, &request.recipient_id] {
            if !pair.contains(user) {
                return Err(ChatDomainError::NotThreadParticipant {
                    thread_id: thread.id(),
                    user: user.clone(),
                }
                .into());
            }
        }
        if request.sender_id == request.recipient_id {
            return Err(ChatDomainError::SameParticipant(request.sender_id).into());
        }

        let content = request.content.trim().to_owned();
        let attachment = request
            .attachment
            .map(|reference| reference.trim().to_owned())
            .filter(|reference| !reference.is_empty());
        if content.is_empty() && attachment.is_none() {
            return Err(ChatDomainError::EmptyMessage.into());
        }

        let message = ChatMessage {
            id: MessageId::new(),
            thread_id: thread.id(),
            sender_id: request.sender_id,
            recipient_id: request.recipient_id,
            content,
            attachment,
            task_id: request.task_id,
            created_at: self.clock.utc(),
        };
        self.repository.append_message(&message).await?;
        Ok(message.id)
    }

    /// Loads a thread.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::ThreadNotFound`] for unknown threads.
    pub async fn thread(&self, id: ThreadId) -> ChatResult<ChatThread> {
        self.repository
            .find_thread(id)
            .await?
            .ok_or(ChatError::ThreadNotFound(id))
    }

    /// Returns a thread's messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StoreUnavailable`] when the store fails.
    pub async fn messages_in_thread(&self, id: ThreadId) -> ChatResult<Vec<ChatMessage>> {
        Ok(self.repository.messages_in_thread(id).await?)
    }

    /// Returns messages tagged with `task_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StoreUnavailable`] when the store fails.
    pub async fn messages_for_task(&self, task_id: TaskId) -> ChatResult<Vec<ChatMessage>> {
        Ok(self.repository.messages_for_task(task_id).await?)
    }

    /// Returns the threads `user` takes part in, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::StoreUnavailable`] when the store fails.
    pub async fn threads_for_user(&self, user: &UserId) -> ChatResult<Vec<ChatThread>> {
        Ok(self.repository.threads_for_user(user).await?)
    }
}
