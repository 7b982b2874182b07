//! Port contracts for the engine's external collaborators.

pub mod task_store;
pub mod tracker;

pub use task_store::{
    StatusTransition, TaskDraft, TaskFilter, TaskRecord, TaskStore, TaskStoreError,
    TaskStoreResult,
};
pub use tracker::{
    IssueComment, IssueFilter, IssueRecord, IssueTracker, TrackerError, TrackerResult,
};
