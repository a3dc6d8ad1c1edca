//! Port contracts for notifications.

pub mod push;
pub mod repository;

pub use push::{PushError, PushGateway, PushMessage};
pub use repository::{
    NotificationRepository, NotificationRepositoryError, NotificationRepositoryResult,
};
