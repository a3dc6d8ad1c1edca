//! In-memory task store and progress log.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::identity::UserId;
use crate::live::{SubscriberSet, Subscription};
use crate::task::{
    domain::{ProgressEntry, ProgressEntryId, Task, TaskFilter, TaskId},
    ports::{
        ProgressLog, TaskGuard, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
        TaskTransition, TransitionReceipt,
    },
};

/// Thread-safe in-memory task repository.
///
/// Tasks, progress entries, and the per-user counters share one lock, so a
/// transition commits them together. Subscribers are notified before
/// the lock is released.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: HashMap<TaskId, Task>,
    progress: Vec<ProgressEntry>,
    cancellations: HashMap<UserId, u32>,
    completions: HashMap<UserId, u64>,
    task_subscribers: SubscriberSet<TaskFilter, Task>,
    progress_subscribers: SubscriberSet<TaskId, ProgressEntry>,
}

impl InMemoryTaskState {
    fn select(&self, filter: &TaskFilter) -> Vec<Task> {
        select_tasks(&self.tasks, filter)
    }

    fn progress_for(&self, task_id: TaskId) -> Vec<ProgressEntry> {
        progress_for(&self.progress, task_id)
    }

    fn stored(&self, id: TaskId) -> TaskRepositoryResult<&Task> {
        self.tasks.get(&id).ok_or(TaskRepositoryError::NotFound(id))
    }

    fn check_guard(&self, id: TaskId, expected: &TaskGuard) -> TaskRepositoryResult<()> {
        let current = self.stored(id)?;
        if expected.holds_for(current) {
            Ok(())
        } else {
            Err(TaskRepositoryError::Conflict {
                task_id: id,
                current: Box::new(current.clone()),
            })
        }
    }

    fn publish_tasks(&mut self) {
        let Self {
            tasks,
            task_subscribers,
            ..
        } = self;
        task_subscribers.publish(|filter| select_tasks(tasks, filter));
    }

    fn publish_progress(&mut self, changed: TaskId) {
        let Self {
            progress,
            progress_subscribers,
            ..
        } = self;
        progress_subscribers.publish_where(
            |task_id| *task_id == changed,
            |task_id| progress_for(progress, *task_id),
        );
    }
}

fn select_tasks(tasks: &HashMap<TaskId, Task>, filter: &TaskFilter) -> Vec<Task> {
    let mut selected: Vec<Task> = tasks
        .values()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect();
    selected.sort_by(|left, right| {
        right
            .created_at()
            .cmp(&left.created_at())
            .then_with(|| left.id().as_ref().cmp(right.id().as_ref()))
    });
    selected
}

fn progress_for(progress: &[ProgressEntry], task_id: TaskId) -> Vec<ProgressEntry> {
    let mut entries: Vec<ProgressEntry> = progress
        .iter()
        .filter(|entry| entry.task_id == task_id)
        .cloned()
        .collect();
    entries.sort_by_key(|entry| entry.created_at);
    entries
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        state.publish_tasks();
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn update_details(&self, task: &Task, expected: &TaskGuard) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.check_guard(task.id(), expected)?;
        let Some(stored) = state.tasks.get(&task.id()) else {
            return Err(TaskRepositoryError::NotFound(task.id()));
        };
        let merged = stored.with_details_of(task);
        state.tasks.insert(task.id(), merged);
        state.publish_tasks();
        Ok(())
    }

    async fn commit_transition(
        &self,
        transition: &TaskTransition,
    ) -> TaskRepositoryResult<TransitionReceipt> {
        let mut state = self.state.write().map_err(lock_error)?;
        let task_id = transition.task.id();
        state.check_guard(task_id, &transition.expected)?;

        state.tasks.insert(task_id, transition.task.clone());
        state.progress.push(transition.progress.clone());
        let cancellation_count = transition.count_cancellation_for.as_ref().map(|user| {
            let count = state.cancellations.entry(user.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        });
        let completion_count = transition.count_completion_for.as_ref().map(|user| {
            let count = state.completions.entry(user.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        });

        state.publish_tasks();
        state.publish_progress(task_id);
        Ok(TransitionReceipt {
            cancellation_count,
            completion_count,
        })
    }

    async fn query(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.select(filter))
    }

    async fn subscribe(&self, filter: TaskFilter) -> TaskRepositoryResult<Subscription<Task>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let initial = state.select(&filter);
        Ok(state.task_subscribers.register(filter, initial))
    }

    async fn cancellation_count(&self, user: &UserId) -> TaskRepositoryResult<u32> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.cancellations.get(user).copied().unwrap_or(0))
    }

    async fn count_completed_by(&self, user: &UserId) -> TaskRepositoryResult<u64> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.completions.get(user).copied().unwrap_or(0))
    }
}

#[async_trait]
impl ProgressLog for InMemoryTaskRepository {
    async fn append(&self, entry: &ProgressEntry) -> TaskRepositoryResult<ProgressEntryId> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.progress.push(entry.clone());
        state.publish_progress(entry.task_id);
        Ok(entry.id)
    }

    async fn list_for(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<ProgressEntry>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.progress_for(task_id))
    }

    async fn subscribe(
        &self,
        task_id: TaskId,
    ) -> TaskRepositoryResult<Subscription<ProgressEntry>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let initial = state.progress_for(task_id);
        Ok(state.progress_subscribers.register(task_id, initial))
    }
}
