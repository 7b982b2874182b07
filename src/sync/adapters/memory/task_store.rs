//! In-memory task store for sync engine tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::link::domain::{SyncLabel, TaskId, TaskStatus};
use crate::sync::ports::{
    StatusTransition, TaskDraft, TaskFilter, TaskRecord, TaskStore, TaskStoreError,
    TaskStoreResult,
};

/// Task store operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOp {
    /// `create_task`
    Create,
    /// `get_task`
    Get,
    /// `update_status`
    UpdateStatus,
    /// `list_tasks`
    List,
    /// `add_label`
    AddLabel,
}

#[derive(Default)]
struct StoreState {
    tasks: HashMap<TaskId, TaskRecord>,
    failures: HashMap<TaskOp, u32>,
}

/// Thread-safe in-memory task store.
#[derive(Clone)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<StoreState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store stamping with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Creates an empty in-memory store stamping with the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            clock,
        }
    }

    /// Test hook: the next `count` calls of `op` fail as unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Unavailable`] when internal state is
    /// poisoned.
    pub fn inject_failures(&self, op: TaskOp, count: u32) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.failures.insert(op, count);
        Ok(())
    }

    /// Test hook: records a status transition with an explicit timestamp,
    /// simulating a concurrent local edit observed at a known instant.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    pub fn set_status_at(
        &self,
        id: TaskId,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> TaskStoreResult<TaskRecord> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::NotFound(id))?;
        let previous = task.status;
        task.status = status;
        task.history.push(StatusTransition {
            from: previous,
            to: status,
            at,
        });
        Ok(task.clone())
    }

    fn consume_failure(state: &mut StoreState, op: TaskOp) -> TaskStoreResult<()> {
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TaskStoreError::Unavailable("injected failure".to_owned()));
            }
        }
        Ok(())
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> TaskStoreError {
    TaskStoreError::Unavailable(err.to_string())
}

fn matches_filter(task: &TaskRecord, filter: &TaskFilter) -> bool {
    filter
        .project_id
        .is_none_or(|project_id| task.project_id == project_id)
        && filter.status.is_none_or(|status| task.status == status)
        && filter
            .label
            .as_ref()
            .is_none_or(|label| task.labels.iter().any(|candidate| candidate == label))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self, draft: TaskDraft) -> TaskStoreResult<TaskRecord> {
        let record = TaskRecord {
            id: TaskId::new(),
            project_id: draft.project_id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            labels: draft.labels,
            history: Vec::new(),
            created_at: self.clock.utc(),
        };
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TaskOp::Create)?;
        state.tasks.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_task(&self, id: TaskId) -> TaskStoreResult<Option<TaskRecord>> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TaskOp::Get)?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> TaskStoreResult<TaskRecord> {
        let at = self.clock.utc();
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TaskOp::UpdateStatus)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::NotFound(id))?;
        if task.status != status {
            let previous = task.status;
            task.status = status;
            task.history.push(StatusTransition {
                from: previous,
                to: status,
                at,
            });
        }
        Ok(task.clone())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> TaskStoreResult<Vec<TaskRecord>> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TaskOp::List)?;
        let mut tasks: Vec<TaskRecord> = state
            .tasks
            .values()
            .filter(|task| matches_filter(task, &filter))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.created_at);
        Ok(tasks)
    }

    async fn add_label(&self, id: TaskId, label: SyncLabel) -> TaskStoreResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TaskOp::AddLabel)?;
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::NotFound(id))?;
        let rendered = label.to_string();
        if !task.labels.contains(&rendered) {
            task.labels.push(rendered);
        }
        Ok(())
    }
}
