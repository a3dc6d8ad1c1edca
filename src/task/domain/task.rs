//! Task aggregate root.

use super::{TaskDomainError, TaskId, TaskStatus};
use crate::identity::UserId;
use crate::wallet::domain::Money;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Descriptive fields of a task, editable by the creator while it is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    /// Short title shown in listings.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Listing category (for example `delivery` or `tutoring`).
    pub category: String,
    /// Where the task takes place.
    pub location: String,
    /// Amount paid to the performer on completion.
    pub price: Money,
    /// Creator's estimate of the effort, as entered.
    pub estimated_time: Option<String>,
}

impl TaskDetails {
    /// Creates details with the required title and price.
    #[must_use]
    pub fn new(title: impl Into<String>, price: Money) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category: String::new(),
            location: String::new(),
            price,
            estimated_time: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Sets the effort estimate.
    #[must_use]
    pub fn with_estimated_time(mut self, estimated_time: impl Into<String>) -> Self {
        self.estimated_time = Some(estimated_time.into());
        self
    }

    fn validate(&self) -> Result<(), TaskDomainError> {
        if self.title.trim().is_empty() {
            return Err(TaskDomainError::EmptyTitle);
        }
        if self.price.is_negative() {
            return Err(TaskDomainError::NegativePrice);
        }
        Ok(())
    }
}

/// Partial update of [`TaskDetails`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDetailsPatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement category.
    pub category: Option<String>,
    /// Replacement location.
    pub location: Option<String>,
    /// Replacement price.
    pub price: Option<Money>,
    /// Replacement effort estimate.
    pub estimated_time: Option<String>,
}

impl TaskDetailsPatch {
    fn apply_to(self, details: &TaskDetails) -> TaskDetails {
        TaskDetails {
            title: self.title.unwrap_or_else(|| details.title.clone()),
            description: self.description.unwrap_or_else(|| details.description.clone()),
            category: self.category.unwrap_or_else(|| details.category.clone()),
            location: self.location.unwrap_or_else(|| details.location.clone()),
            price: self.price.unwrap_or(details.price),
            estimated_time: self.estimated_time.or_else(|| details.estimated_time.clone()),
        }
    }
}

/// Task aggregate root.
///
/// Status only changes through [`Task::accept`], [`Task::advance`], and
/// [`Task::cancel`]. Each validates its guards before touching any field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    details: TaskDetails,
    created_by: UserId,
    accepted_by: Option<UserId>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted descriptive fields.
    pub details: TaskDetails,
    /// Persisted creator.
    pub created_by: UserId,
    /// Persisted performer, if any.
    pub accepted_by: Option<UserId>,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted cancellation timestamp.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Persisted cancellation reason.
    pub cancellation_reason: Option<String>,
}

impl Task {
    /// Creates an open task posted by `created_by`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] or
    /// [`TaskDomainError::NegativePrice`] for invalid details.
    pub fn post(
        created_by: UserId,
        details: TaskDetails,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        details.validate()?;
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            details,
            created_by,
            accepted_by: None,
            status: TaskStatus::Open,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            details: data.details,
            created_by: data.created_by,
            accepted_by: data.accepted_by,
            status: data.status,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
            cancelled_at: data.cancelled_at,
            cancellation_reason: data.cancellation_reason,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub const fn details(&self) -> &TaskDetails {
        &self.details
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.details.title
    }

    /// Returns the price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.details.price
    }

    /// Returns the creator.
    #[must_use]
    pub const fn created_by(&self) -> &UserId {
        &self.created_by
    }

    /// Returns the performer, if the task has been accepted.
    #[must_use]
    pub const fn accepted_by(&self) -> Option<&UserId> {
        self.accepted_by.as_ref()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the completion timestamp.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the cancellation timestamp.
    #[must_use]
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    /// Returns the cancellation reason.
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Returns `true` when `user` is the creator or the performer.
    #[must_use]
    pub fn is_party(&self, user: &UserId) -> bool {
        self.created_by == *user || self.accepted_by.as_ref() == Some(user)
    }

    /// Returns the other party relative to `user`, if there is one.
    #[must_use]
    pub fn counterparty(&self, user: &UserId) -> Option<&UserId> {
        if self.created_by == *user {
            self.accepted_by.as_ref()
        } else if self.accepted_by.as_ref() == Some(user) {
            Some(&self.created_by)
        } else {
            None
        }
    }

    /// Checks the party invariant: an open task has no performer, a task in
    /// flight or completed has one, and the performer is never the creator.
    /// A task cancelled before acceptance keeps an empty performer.
    #[must_use]
    pub fn parties_consistent(&self) -> bool {
        let performer_matches_status = match self.status {
            TaskStatus::Open => self.accepted_by.is_none(),
            TaskStatus::Cancelled => true,
            _ => self.accepted_by.is_some(),
        };
        performer_matches_status && self.accepted_by.as_ref() != Some(&self.created_by)
    }

    /// Assigns `actor` as performer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SelfAcceptance`] when `actor` is the
    /// creator and [`TaskDomainError::AlreadyAccepted`] unless the task is
    /// open.
    pub fn accept(&mut self, actor: &UserId, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if *actor == self.created_by {
            return Err(TaskDomainError::SelfAcceptance(self.id));
        }
        if self.status != TaskStatus::Open {
            return Err(TaskDomainError::AlreadyAccepted {
                task_id: self.id,
                status: self.status,
            });
        }
        self.status = TaskStatus::Accepted;
        self.accepted_by = Some(actor.clone());
        self.touch(clock);
        Ok(())
    }

    /// Moves the task to `target` on behalf of the performer.
    ///
    /// Reaching `completed` also stamps `completed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotPerformer`] unless `actor` is the
    /// performer and [`TaskDomainError::InvalidTransition`] when `target` is
    /// neither the next step nor `completed`.
    pub fn advance(
        &mut self,
        actor: &UserId,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.accepted_by.as_ref() != Some(actor) {
            return Err(TaskDomainError::NotPerformer(self.id));
        }
        if !self.status.can_advance_to(target) {
            return Err(TaskDomainError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.touch(clock);
        if target == TaskStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }

    /// Cancels the task on behalf of either party.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotParticipant`] for strangers,
    /// [`TaskDomainError::InvalidTransition`] for terminal tasks, and
    /// [`TaskDomainError::MissingReason`] for a blank reason.
    pub fn cancel(
        &mut self,
        actor: &UserId,
        reason: &str,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.is_party(actor) {
            return Err(TaskDomainError::NotParticipant(self.id));
        }
        if self.status.is_terminal() {
            return Err(TaskDomainError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Cancelled,
            });
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(TaskDomainError::MissingReason);
        }
        self.status = TaskStatus::Cancelled;
        self.cancellation_reason = Some(reason.to_owned());
        self.touch(clock);
        self.cancelled_at = Some(self.updated_at);
        Ok(())
    }

    /// Applies a details patch on behalf of the creator.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotParticipant`] unless `actor` is the
    /// creator, [`TaskDomainError::AlreadyAccepted`] once the task has left
    /// `open`, and a validation error for invalid replacement values.
    pub fn edit_details(
        &mut self,
        actor: &UserId,
        patch: TaskDetailsPatch,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if *actor != self.created_by {
            return Err(TaskDomainError::NotParticipant(self.id));
        }
        if self.status != TaskStatus::Open {
            return Err(TaskDomainError::AlreadyAccepted {
                task_id: self.id,
                status: self.status,
            });
        }
        let details = patch.apply_to(&self.details);
        details.validate()?;
        self.details = details;
        self.touch(clock);
        Ok(())
    }

    /// Returns a copy of `self` carrying the details and `updated_at` of
    /// `edited`. Status, parties, and lifecycle timestamps are kept.
    #[must_use]
    pub fn with_details_of(&self, edited: &Self) -> Self {
        Self {
            details: edited.details.clone(),
            updated_at: edited.updated_at,
            ..self.clone()
        }
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
