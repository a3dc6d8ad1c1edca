//! In-memory chat adapters for tests and embedded use.

mod repository;

pub use repository::InMemoryChatRepository;
