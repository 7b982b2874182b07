//! Pure mapping rules between task statuses and issue states.
//!
//! No side effects and no external calls: the engine feeds observed values
//! in and applies the returned plans through its collaborators.

use crate::link::domain::{IssueState, TaskStatus};
use crate::sync::domain::SyncSource;
use chrono::{DateTime, Utc};

/// Remote mutation derived from a task status transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IssuePlan {
    /// Issue state the tracker should be moved to, when it must change.
    pub target_state: Option<IssueState>,
    /// Comment to post on the issue for this transition, if any.
    pub comment: Option<String>,
}

impl IssuePlan {
    /// Returns `true` when the plan requires no remote mutation at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.target_state.is_none() && self.comment.is_none()
    }
}

/// Comment body announcing a task status transition on the linked issue.
#[must_use]
pub fn transition_comment(status: TaskStatus) -> String {
    format!("status changed to {status}")
}

/// Computes the remote issue mutation for a task status transition.
///
/// Transitions into `in_progress` leave the issue state alone but announce
/// progress; completing a task closes the issue; leaving `done` reopens
/// it. Transitions the tables are silent on (e.g. `in_progress` back to
/// `todo`) produce an empty plan.
#[must_use]
pub fn plan_issue_mutation(old: TaskStatus, new: TaskStatus) -> IssuePlan {
    if old == new {
        return IssuePlan::default();
    }
    match new {
        TaskStatus::InProgress => IssuePlan {
            target_state: (old == TaskStatus::Done).then_some(IssueState::Open),
            comment: Some(transition_comment(new)),
        },
        TaskStatus::Done => IssuePlan {
            target_state: Some(IssueState::Closed),
            comment: Some(transition_comment(new)),
        },
        TaskStatus::Todo => IssuePlan {
            target_state: (old == TaskStatus::Done).then_some(IssueState::Open),
            comment: (old == TaskStatus::Done).then(|| transition_comment(new)),
        },
    }
}

/// Computes the local task mutation for an issue state transition.
///
/// A close maps to `done` unless the task already is; a reopen resets the
/// progress marker to `todo`. Returns `None` when the task should not
/// move.
#[must_use]
pub fn plan_task_mutation(
    old: IssueState,
    new: IssueState,
    current: TaskStatus,
) -> Option<TaskStatus> {
    if old == new {
        return None;
    }
    match new {
        IssueState::Closed => (current != TaskStatus::Done).then_some(TaskStatus::Done),
        IssueState::Open => Some(TaskStatus::Todo),
    }
}

/// Issue state a task status implies, used when reconciling divergence.
#[must_use]
pub const fn issue_state_for(status: TaskStatus) -> IssueState {
    match status {
        TaskStatus::Todo | TaskStatus::InProgress => IssueState::Open,
        TaskStatus::Done => IssueState::Closed,
    }
}

/// Task status an issue state implies, given the task's current status.
///
/// A closed issue demands `done`; an open issue only forces a move when
/// the task claims completion, in which case the progress marker resets.
#[must_use]
pub const fn task_status_for(state: IssueState, current: TaskStatus) -> TaskStatus {
    match state {
        IssueState::Closed => TaskStatus::Done,
        IssueState::Open => match current {
            TaskStatus::Done => TaskStatus::Todo,
            TaskStatus::Todo | TaskStatus::InProgress => current,
        },
    }
}

/// Tie-break between a task-side and an issue-side change observed for the
/// same link: the more recent observation wins, and an exact tie goes to
/// the task side, since the task store is the authoritative planning
/// record.
#[must_use]
pub fn winning_source(
    task_observed_at: DateTime<Utc>,
    issue_observed_at: DateTime<Utc>,
) -> SyncSource {
    if issue_observed_at > task_observed_at {
        SyncSource::Issue
    } else {
        SyncSource::Task
    }
}
