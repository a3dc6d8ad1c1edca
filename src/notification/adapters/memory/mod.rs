//! In-memory notification adapters for tests and embedded use.

mod push;
mod repository;

pub use push::RecordingPushGateway;
pub use repository::InMemoryNotificationRepository;
