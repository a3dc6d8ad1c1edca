//! Port contracts for chat.

pub mod repository;

pub use repository::{ChatRepository, ChatRepositoryError, ChatRepositoryResult};
