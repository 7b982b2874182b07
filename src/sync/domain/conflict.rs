//! Pure conflict resolution over currently observed state.
//!
//! Invoked when the state read at mutation time disagrees with the
//! snapshot a sync event was computed from: both sides moved
//! independently. Resolution recomputes the target from the fresh values
//! and the tie-break rule rather than the stale snapshot.

use crate::link::domain::{IssueState, SyncDirection, TaskStatus};
use crate::sync::domain::SyncSource;
use crate::sync::domain::mapper::{
    issue_state_for, task_status_for, transition_comment, winning_source,
};
use chrono::{DateTime, Utc};

/// Deterministic outcome of arbitrating a diverged link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Side whose observed state prevailed.
    pub winner: SyncSource,
    /// Task status both sides should settle on.
    pub task_status: TaskStatus,
    /// Issue state both sides should settle on.
    pub issue_state: IssueState,
    /// Comment to post on the issue when the issue side must move.
    pub comment: Option<String>,
    /// Direction the settled snapshot should record.
    pub direction: SyncDirection,
}

/// Arbitrates divergence between freshly observed task and issue state.
///
/// The winner is chosen by observation recency (task wins exact ties); the
/// losing side's target is derived from the winner through the
/// reconciliation mappings. The returned resolution is a full settled
/// picture: callers mutate whichever side differs from it.
#[must_use]
pub fn resolve_divergence(
    task_status: TaskStatus,
    task_observed_at: DateTime<Utc>,
    issue_state: IssueState,
    issue_observed_at: DateTime<Utc>,
) -> Resolution {
    let winner = winning_source(task_observed_at, issue_observed_at);
    match winner {
        SyncSource::Task => {
            let target = issue_state_for(task_status);
            Resolution {
                winner,
                task_status,
                issue_state: target,
                comment: (target != issue_state).then(|| transition_comment(task_status)),
                direction: SyncDirection::LocalToRemote,
            }
        }
        SyncSource::Issue => Resolution {
            winner,
            task_status: task_status_for(issue_state, task_status),
            issue_state,
            comment: None,
            direction: SyncDirection::RemoteToLocal,
        },
    }
}
