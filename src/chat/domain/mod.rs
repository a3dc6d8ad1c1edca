//! Domain model for two-party chat.

mod error;
mod ids;
mod message;
mod participants;
mod thread;

pub use error::ChatDomainError;
pub use ids::{MessageId, ThreadId};
pub use message::{ATTACHMENT_SUMMARY, ChatMessage};
pub use participants::ParticipantPair;
pub use thread::{ChatThread, PersistedThreadData};
