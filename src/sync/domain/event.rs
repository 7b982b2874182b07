//! Sync event value objects.
//!
//! A sync event describes a single observed change on one side of a link.
//! Events are ephemeral: they drive one pass through the engine and are
//! discarded after application.

use crate::link::domain::{IssueNumber, IssueState, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of a link that produced an observed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    /// The local task store.
    Task,
    /// The remote issue tracker.
    Issue,
}

/// The observed change carried by a sync event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SyncChange {
    /// A task status transition in the local store.
    Task {
        /// Identifier of the task that changed.
        task_id: TaskId,
        /// Status before the change.
        from: TaskStatus,
        /// Status after the change.
        to: TaskStatus,
    },
    /// An issue state transition on the remote tracker.
    Issue {
        /// Number of the issue that changed.
        issue_number: IssueNumber,
        /// State before the change.
        from: IssueState,
        /// State after the change.
        to: IssueState,
    },
}

impl SyncChange {
    /// Returns the side that produced the change.
    #[must_use]
    pub const fn source(&self) -> SyncSource {
        match self {
            Self::Task { .. } => SyncSource::Task,
            Self::Issue { .. } => SyncSource::Issue,
        }
    }
}

/// A single observed change plus the timestamp it was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    change: SyncChange,
    observed_at: DateTime<Utc>,
}

impl SyncEvent {
    /// Creates a sync event from an observed change.
    #[must_use]
    pub const fn new(change: SyncChange, observed_at: DateTime<Utc>) -> Self {
        Self {
            change,
            observed_at,
        }
    }

    /// Returns the observed change.
    #[must_use]
    pub const fn change(&self) -> SyncChange {
        self.change
    }

    /// Returns the observation timestamp.
    #[must_use]
    pub const fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}
