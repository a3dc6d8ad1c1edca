//! Listing filters for task queries and subscriptions.

use super::{Task, TaskStatus};
use crate::identity::UserId;

/// Conjunctive task filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Accepted statuses; empty means any status.
    pub statuses: Vec<TaskStatus>,
    /// Restricts results to tasks posted by this user.
    pub created_by: Option<UserId>,
    /// Restricts results to tasks performed by this user.
    pub accepted_by: Option<UserId>,
    /// Restricts results to one category.
    pub category: Option<String>,
}

impl TaskFilter {
    /// Matches every task.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Open tasks, as shown on the marketplace board.
    #[must_use]
    pub fn open() -> Self {
        Self::default().with_statuses([TaskStatus::Open])
    }

    /// Tasks posted by `user`.
    #[must_use]
    pub fn posted_by(user: UserId) -> Self {
        Self {
            created_by: Some(user),
            ..Self::default()
        }
    }

    /// Tasks performed by `user`.
    #[must_use]
    pub fn performed_by(user: UserId) -> Self {
        Self {
            accepted_by: Some(user),
            ..Self::default()
        }
    }

    /// Restricts the filter to the given statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Restricts the filter to one category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Returns `true` when `task` satisfies every populated field.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&task.status()))
            && self
                .created_by
                .as_ref()
                .is_none_or(|user| task.created_by() == user)
            && self
                .accepted_by
                .as_ref()
                .is_none_or(|user| task.accepted_by() == Some(user))
            && self
                .category
                .as_deref()
                .is_none_or(|category| task.details().category == category)
    }
}
