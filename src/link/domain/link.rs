//! Link aggregate root: the 1:1 task-to-issue association.

use super::{IssueNumber, IssueState, LinkId, SyncDirection, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Processing phase of a link.
///
/// `Unlinked` is represented by the absence of a link. `Conflicted` and
/// `Broken` are terminal for automatic processing and require external
/// intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPhase {
    /// Link created; no synchronization has run yet.
    Linked,
    /// A sync event is being applied, or the last application stalled on a
    /// transient failure and awaits reconciliation.
    Syncing,
    /// Both sides reflected the last processed event.
    Synced,
    /// Divergence the resolver could not settle; needs human resolution.
    Conflicted,
    /// One side vanished permanently; the link is dead.
    Broken,
}

impl LinkPhase {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Conflicted => "conflicted",
            Self::Broken => "broken",
        }
    }

    /// Returns `true` when the phase accepts further sync events.
    #[must_use]
    pub const fn accepts_events(self) -> bool {
        matches!(self, Self::Linked | Self::Syncing | Self::Synced)
    }
}

/// Partial snapshot update applied after a settled synchronization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotUpdate {
    /// New last-known task status, when the task side changed.
    pub task_status: Option<TaskStatus>,
    /// New last-known issue state, when the issue side changed.
    pub issue_state: Option<IssueState>,
    /// Direction of the synchronization that produced this snapshot.
    pub direction: SyncDirection,
    /// Timestamp at which the synchronization settled.
    pub synced_at: DateTime<Utc>,
}

/// Link aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    id: LinkId,
    task_id: TaskId,
    issue_number: IssueNumber,
    task_status: TaskStatus,
    issue_state: IssueState,
    phase: LinkPhase,
    direction: Option<SyncDirection>,
    last_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted link aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLinkData {
    /// Persisted link identifier.
    pub id: LinkId,
    /// Persisted task identifier.
    pub task_id: TaskId,
    /// Persisted issue number.
    pub issue_number: IssueNumber,
    /// Persisted last-known task status.
    pub task_status: TaskStatus,
    /// Persisted last-known issue state.
    pub issue_state: IssueState,
    /// Persisted processing phase.
    pub phase: LinkPhase,
    /// Persisted direction of the last successful sync, if any.
    pub direction: Option<SyncDirection>,
    /// Persisted last settled-sync timestamp, if any.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Creates a new link seeded with the observed state of both sides.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        issue_number: IssueNumber,
        task_status: TaskStatus,
        issue_state: IssueState,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: LinkId::new(),
            task_id,
            issue_number,
            task_status,
            issue_state,
            phase: LinkPhase::Linked,
            direction: None,
            last_synced_at: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a link from persisted storage.
    #[must_use]
    pub const fn from_persisted(data: PersistedLinkData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            issue_number: data.issue_number,
            task_status: data.task_status,
            issue_state: data.issue_state,
            phase: data.phase,
            direction: data.direction,
            last_synced_at: data.last_synced_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the link identifier.
    #[must_use]
    pub const fn id(&self) -> LinkId {
        self.id
    }

    /// Returns the linked task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the linked issue number.
    #[must_use]
    pub const fn issue_number(&self) -> IssueNumber {
        self.issue_number
    }

    /// Returns the last-known task status.
    #[must_use]
    pub const fn task_status(&self) -> TaskStatus {
        self.task_status
    }

    /// Returns the last-known issue state.
    #[must_use]
    pub const fn issue_state(&self) -> IssueState {
        self.issue_state
    }

    /// Returns the processing phase.
    #[must_use]
    pub const fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// Returns the direction of the last successful sync, if any.
    #[must_use]
    pub const fn direction(&self) -> Option<SyncDirection> {
        self.direction
    }

    /// Returns the timestamp of the last settled sync, if any.
    #[must_use]
    pub const fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a settled snapshot update to the aggregate.
    pub fn apply_snapshot(&mut self, update: &SnapshotUpdate) {
        if let Some(task_status) = update.task_status {
            self.task_status = task_status;
        }
        if let Some(issue_state) = update.issue_state {
            self.issue_state = issue_state;
        }
        self.direction = Some(update.direction);
        self.last_synced_at = Some(update.synced_at);
        self.updated_at = update.synced_at;
    }

    /// Moves the link to a new processing phase.
    pub const fn set_phase(&mut self, phase: LinkPhase, at: DateTime<Utc>) {
        self.phase = phase;
        self.updated_at = at;
    }
}
