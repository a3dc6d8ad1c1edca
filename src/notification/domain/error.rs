//! Error types for notification rules.

use super::NotificationId;
use thiserror::Error;

/// Rule violations raised by the notification domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationDomainError {
    /// Only the recipient may mark a notification read.
    #[error("notification {0} belongs to another user")]
    NotRecipient(NotificationId),

    /// A copy template failed to render.
    #[error("failed to render {kind} notification: {reason}")]
    TemplateRender {
        /// Notification kind whose template failed.
        kind: &'static str,
        /// Renderer message.
        reason: String,
    },
}

/// Error returned while parsing notification kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown notification kind: {0}")]
pub struct ParseNotificationKindError(pub String);
