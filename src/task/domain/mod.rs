//! Domain model for the task lifecycle.
//!
//! Holds the task aggregate, its status machine, and the progress log entry
//! type. Nothing here touches storage or the wallet.

mod error;
mod filter;
mod ids;
mod progress;
mod status;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use filter::TaskFilter;
pub use ids::{ProgressEntryId, TaskId};
pub use progress::ProgressEntry;
pub use status::TaskStatus;
pub use task::{PersistedTaskData, Task, TaskDetails, TaskDetailsPatch};
