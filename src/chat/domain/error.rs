//! Error types for chat rules.

use super::ThreadId;
use crate::identity::UserId;
use thiserror::Error;

/// Rule violations raised by the chat domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatDomainError {
    /// A thread needs two distinct users.
    #[error("a chat thread needs two distinct participants, got {0} twice")]
    SameParticipant(UserId),

    /// Sender and recipient must be exactly the thread's participants.
    #[error("{user} is not a participant of thread {thread_id}")]
    NotThreadParticipant {
        /// Thread that was targeted.
        thread_id: ThreadId,
        /// Offending user.
        user: UserId,
    },

    /// A message needs text or an attachment.
    #[error("a message needs text or an attachment")]
    EmptyMessage,
}
