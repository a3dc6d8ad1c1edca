//! Chat services.

mod chat;

pub use chat::{ChatError, ChatResult, ChatService, PostMessage};
