//! Issue tracker port: the remote GitHub Issues surface.
//!
//! The tracker owns issue identity and state; the engine treats it as an
//! external resource reached through a narrow client with its own
//! auth/retry handling. Only two failure kinds cross this boundary:
//! unavailable (transient) and not-found.

use crate::link::domain::{IssueNumber, IssueState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// A comment on a remote issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    /// Comment body.
    pub body: String,
    /// Tracker-recorded creation time.
    pub created_at: DateTime<Utc>,
}

/// Remote issue as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Tracker-assigned issue number.
    pub number: IssueNumber,
    /// Issue title.
    pub title: String,
    /// Issue body, if any.
    pub body: Option<String>,
    /// Current open/closed state.
    pub state: IssueState,
    /// When the state last changed (creation time for untouched issues).
    pub state_changed_at: DateTime<Utc>,
    /// Comments in creation order (append-only).
    pub comments: Vec<IssueComment>,
}

/// Filter for listing issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IssueFilter {
    /// Restrict to one state.
    pub state: Option<IssueState>,
}

/// Issue tracker client contract.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Creates a new issue and returns it.
    async fn create_issue(&self, title: &str, body: Option<&str>) -> TrackerResult<IssueRecord>;

    /// Fetches an issue by number.
    ///
    /// Returns `None` when the issue does not exist.
    async fn get_issue(&self, number: IssueNumber) -> TrackerResult<Option<IssueRecord>>;

    /// Lists issues matching the filter.
    async fn list_issues(&self, filter: IssueFilter) -> TrackerResult<Vec<IssueRecord>>;

    /// Closes an issue, optionally posting a closing comment.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the issue does not exist.
    async fn close_issue(&self, number: IssueNumber, comment: Option<&str>) -> TrackerResult<()>;

    /// Reopens a closed issue.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the issue does not exist.
    async fn reopen_issue(&self, number: IssueNumber) -> TrackerResult<()>;

    /// Posts a comment on an issue.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the issue does not exist.
    async fn add_comment(&self, number: IssueNumber, body: &str) -> TrackerResult<()>;
}

/// Errors returned by tracker client implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerError {
    /// The issue does not exist on the tracker.
    #[error("issue not found: {0}")]
    NotFound(IssueNumber),

    /// Auth or network failure reaching the tracker; safe to retry.
    #[error("tracker unavailable: {0}")]
    Unavailable(String),
}
