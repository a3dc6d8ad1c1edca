//! Task lifecycle states and the transition table.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle state.
///
/// The happy path is `open → accepted → picked_up → in_progress → on_way →
/// delivered → completed`. `cancelled` is reachable from any non-terminal
/// state, and `completed` is reachable directly from any in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Posted and waiting for a performer.
    Open,
    /// A performer has taken the task.
    Accepted,
    /// The performer has collected the item.
    PickedUp,
    /// Work is under way.
    InProgress,
    /// The performer is travelling to the creator.
    OnWay,
    /// The performer has handed over the result.
    Delivered,
    /// Finished and settled.
    Completed,
    /// Abandoned by either party.
    Cancelled,
}

impl TaskStatus {
    /// All states in lifecycle order.
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::Accepted,
        Self::PickedUp,
        Self::InProgress,
        Self::OnWay,
        Self::Delivered,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::PickedUp => "picked_up",
            Self::InProgress => "in_progress",
            Self::OnWay => "on_way",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` for `completed` and `cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` while a performer holds the task and it is not yet
    /// finished.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::PickedUp | Self::InProgress | Self::OnWay | Self::Delivered
        )
    }

    /// Returns the next step of the fixed sequence, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Open => Some(Self::Accepted),
            Self::Accepted => Some(Self::PickedUp),
            Self::PickedUp => Some(Self::InProgress),
            Self::InProgress => Some(Self::OnWay),
            Self::OnWay => Some(Self::Delivered),
            Self::Delivered => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// Returns whether the performer may move a task from `self` to `target`.
    ///
    /// Legal targets are the next step of the sequence, or `completed` from
    /// any in-flight state. Skipping straight to `completed` is deliberate:
    /// the performer can always finish a task regardless of the current step.
    #[must_use]
    pub fn can_advance_to(self, target: Self) -> bool {
        if !self.is_in_flight() {
            return false;
        }
        target == Self::Completed || self.next() == Some(target)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseTaskStatusError(value.to_owned()))
    }
}
