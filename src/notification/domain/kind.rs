//! Notification kinds and their copy templates.

use super::{NotificationDomainError, ParseNotificationKindError};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone accepted the recipient's task.
    TaskAccepted,
    /// The performer moved the recipient's task forward.
    StatusUpdate,
    /// The recipient's task was completed.
    TaskCompleted,
    /// The recipient was paid for a task.
    PaymentReceived,
    /// The recipient completed their first task.
    Achievement,
    /// The other party cancelled a shared task.
    TaskCancelled,
    /// The recipient was charged a cancellation fee.
    CancellationFee,
}

impl NotificationKind {
    /// All kinds.
    pub const ALL: [Self; 7] = [
        Self::TaskAccepted,
        Self::StatusUpdate,
        Self::TaskCompleted,
        Self::PaymentReceived,
        Self::Achievement,
        Self::TaskCancelled,
        Self::CancellationFee,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskAccepted => "task_accepted",
            Self::StatusUpdate => "status_update",
            Self::TaskCompleted => "task_completed",
            Self::PaymentReceived => "payment_received",
            Self::Achievement => "achievement",
            Self::TaskCancelled => "task_cancelled",
            Self::CancellationFee => "cancellation_fee",
        }
    }

    const fn templates(self) -> (&'static str, &'static str) {
        match self {
            Self::TaskAccepted => (
                "Task accepted",
                "{{ actor }} accepted \"{{ task_title }}\".",
            ),
            Self::StatusUpdate => (
                "Task update",
                "\"{{ task_title }}\" is now {{ status | replace('_', ' ') }}.\
                 {% if notes %} Note: {{ notes }}{% endif %}",
            ),
            Self::TaskCompleted => (
                "Task completed",
                "{{ actor }} completed \"{{ task_title }}\".",
            ),
            Self::PaymentReceived => (
                "Payment received",
                "You received {{ amount }} for \"{{ task_title }}\".",
            ),
            Self::Achievement => (
                "Achievement unlocked",
                "You completed your first task: \"{{ task_title }}\".",
            ),
            Self::TaskCancelled => (
                "Task cancelled",
                "{{ actor }} cancelled \"{{ task_title }}\": {{ reason }}",
            ),
            Self::CancellationFee => (
                "Cancellation fee charged",
                "A {{ amount }} fee was charged for cancelling \"{{ task_title }}\".",
            ),
        }
    }

    /// Renders the title and body for this kind.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationDomainError::TemplateRender`] when a template
    /// cannot be rendered.
    pub fn render(self, context: &CopyContext) -> Result<RenderedCopy, NotificationDomainError> {
        let (title, content) = self.templates();
        let environment = Environment::new();
        let render = |template: &str| {
            environment
                .render_str(template, context)
                .map_err(|error| NotificationDomainError::TemplateRender {
                    kind: self.as_str(),
                    reason: error.to_string(),
                })
        };
        Ok(RenderedCopy {
            title: render(title)?,
            content: render(content)?,
        })
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = ParseNotificationKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| ParseNotificationKindError(value.to_owned()))
    }
}

/// Values substituted into notification templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyContext {
    /// Title of the task concerned.
    pub task_title: String,
    /// User who triggered the notification.
    pub actor: Option<String>,
    /// New task status.
    pub status: Option<String>,
    /// Formatted money amount.
    pub amount: Option<String>,
    /// Cancellation reason.
    pub reason: Option<String>,
    /// Progress note.
    pub notes: Option<String>,
}

impl CopyContext {
    /// Starts a context for the task titled `task_title`.
    #[must_use]
    pub fn for_task(task_title: impl Into<String>) -> Self {
        Self {
            task_title: task_title.into(),
            ..Self::default()
        }
    }

    /// Sets the actor.
    #[must_use]
    pub fn actor(mut self, actor: impl ToString) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Sets the amount.
    #[must_use]
    pub fn amount(mut self, amount: impl ToString) -> Self {
        self.amount = Some(amount.to_string());
        self
    }

    /// Sets the cancellation reason.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the progress note.
    #[must_use]
    pub fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Rendered notification copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCopy {
    /// Short title.
    pub title: String,
    /// Body text.
    pub content: String,
}
