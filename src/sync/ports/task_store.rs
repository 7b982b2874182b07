//! Task store port: the local project-management persistence engine.
//!
//! The store owns task identity and the transition history; the sync
//! engine only reads tasks, moves their status, and attaches the sync
//! label. Create/read/update/list are assumed durable and transactional
//! on the store side.

use crate::link::domain::{ProjectId, SyncLabel, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// One entry in a task's ordered status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Status before the transition.
    pub from: TaskStatus,
    /// Status after the transition.
    pub to: TaskStatus,
    /// When the transition was recorded.
    pub at: DateTime<Utc>,
}

/// Task record as owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Store-assigned task identifier.
    pub id: TaskId,
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// Task title.
    pub title: String,
    /// Task description, if any.
    pub description: Option<String>,
    /// Current workflow status.
    pub status: TaskStatus,
    /// Free-form labels, including any sync label.
    pub labels: Vec<String>,
    /// Ordered history of status transitions.
    pub history: Vec<StatusTransition>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Returns the sync label carried by this task, if any.
    ///
    /// Labels with a malformed `github:` payload are ignored rather than
    /// surfaced; the store does not police label contents.
    #[must_use]
    pub fn sync_label(&self) -> Option<SyncLabel> {
        self.labels
            .iter()
            .filter_map(|raw| SyncLabel::parse(raw).ok().flatten())
            .next()
    }

    /// Returns the timestamp of the most recent status transition, falling
    /// back to the creation time for tasks that never moved.
    #[must_use]
    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.history
            .last()
            .map_or(self.created_at, |transition| transition.at)
    }
}

/// Fields for creating a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Project the task belongs to.
    pub project_id: ProjectId,
    /// Task title.
    pub title: String,
    /// Task description, if any.
    pub description: Option<String>,
    /// Initial workflow status.
    pub status: TaskStatus,
    /// Initial labels.
    pub labels: Vec<String>,
}

/// Filter for listing tasks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    /// Restrict to one project.
    pub project_id: Option<ProjectId>,
    /// Restrict to one status.
    pub status: Option<TaskStatus>,
    /// Restrict to tasks carrying this exact label.
    pub label: Option<String>,
}

/// Task persistence contract.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Creates a new task and returns the stored record.
    async fn create_task(&self, draft: TaskDraft) -> TaskStoreResult<TaskRecord>;

    /// Fetches a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn get_task(&self, id: TaskId) -> TaskStoreResult<Option<TaskRecord>>;

    /// Moves a task to a new status, appending to its transition history.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn update_status(&self, id: TaskId, status: TaskStatus) -> TaskStoreResult<TaskRecord>;

    /// Lists tasks matching the filter.
    async fn list_tasks(&self, filter: TaskFilter) -> TaskStoreResult<Vec<TaskRecord>>;

    /// Attaches a sync label to an existing task.
    ///
    /// Idempotent: re-adding a label the task already carries is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn add_label(&self, id: TaskId, label: SyncLabel) -> TaskStoreResult<()>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskStoreError {
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The store could not be reached or timed out; safe to retry.
    #[error("task store unavailable: {0}")]
    Unavailable(String),
}
