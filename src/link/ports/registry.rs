//! Registry port for link persistence, lookup, and snapshot management.

use crate::link::domain::{
    IssueNumber, Link, LinkId, LinkPhase, SnapshotUpdate, TaskId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for link registry operations.
pub type LinkRegistryResult<T> = Result<T, LinkRegistryError>;

/// Link persistence contract.
///
/// Implementations must be atomic with respect to concurrent callers: two
/// simultaneous attempts to link the same task or issue must result in
/// exactly one success and one duplicate error.
#[async_trait]
pub trait LinkRegistry: Send + Sync {
    /// Stores a new link.
    ///
    /// # Errors
    ///
    /// Returns [`LinkRegistryError::DuplicateTaskLink`] when the task
    /// already participates in a link, or
    /// [`LinkRegistryError::DuplicateIssueLink`] when the issue does.
    async fn create(&self, link: &Link) -> LinkRegistryResult<()>;

    /// Finds a link by its identifier.
    ///
    /// Returns `None` when the link does not exist.
    async fn find_by_id(&self, id: LinkId) -> LinkRegistryResult<Option<Link>>;

    /// Finds the link for a task identifier.
    ///
    /// Returns `None` when the task is not linked.
    async fn find_by_task(&self, task_id: TaskId) -> LinkRegistryResult<Option<Link>>;

    /// Finds the link for an issue number.
    ///
    /// Returns `None` when the issue is not linked.
    async fn find_by_issue(&self, issue_number: IssueNumber) -> LinkRegistryResult<Option<Link>>;

    /// Applies a settled snapshot update and returns the updated link.
    ///
    /// # Errors
    ///
    /// Returns [`LinkRegistryError::NotFound`] when the link no longer
    /// exists (e.g. the task was deleted out from under the engine).
    async fn update_snapshot(
        &self,
        id: LinkId,
        update: SnapshotUpdate,
    ) -> LinkRegistryResult<Link>;

    /// Moves a link to a new processing phase and returns the updated link.
    ///
    /// # Errors
    ///
    /// Returns [`LinkRegistryError::NotFound`] when the link no longer
    /// exists.
    async fn set_phase(
        &self,
        id: LinkId,
        phase: LinkPhase,
        at: DateTime<Utc>,
    ) -> LinkRegistryResult<Link>;

    /// Deletes a link. Idempotent: a missing link is a no-op.
    async fn delete(&self, id: LinkId) -> LinkRegistryResult<()>;
}

/// Errors returned by link registry implementations.
#[derive(Debug, Clone, Error)]
pub enum LinkRegistryError {
    /// The task already participates in a link.
    #[error("task already linked: {0}")]
    DuplicateTaskLink(TaskId),

    /// The issue already participates in a link.
    #[error("issue already linked: {0}")]
    DuplicateIssueLink(IssueNumber),

    /// The link was not found.
    #[error("link not found: {0}")]
    NotFound(LinkId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LinkRegistryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
