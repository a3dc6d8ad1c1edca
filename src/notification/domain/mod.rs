//! Domain model for user notifications.

mod error;
mod ids;
mod kind;
mod notification;

pub use error::{NotificationDomainError, ParseNotificationKindError};
pub use ids::NotificationId;
pub use kind::{CopyContext, NotificationKind, RenderedCopy};
pub use notification::Notification;
