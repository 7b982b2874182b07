//! In-memory issue tracker for sync engine tests.
//!
//! Assigns issue numbers monotonically like the real tracker, keeps
//! append-only comment lists, and offers hooks for simulating external
//! state changes and transient outages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::link::domain::{IssueNumber, IssueState, LinkDomainError};
use crate::sync::ports::{
    IssueComment, IssueFilter, IssueRecord, IssueTracker, TrackerError, TrackerResult,
};

/// Tracker operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOp {
    /// `create_issue`
    Create,
    /// `get_issue`
    Get,
    /// `list_issues`
    List,
    /// `close_issue`
    Close,
    /// `reopen_issue`
    Reopen,
    /// `add_comment`
    Comment,
}

#[derive(Default)]
struct TrackerState {
    issues: BTreeMap<IssueNumber, IssueRecord>,
    next_number: u64,
    failures: HashMap<TrackerOp, u32>,
}

/// Thread-safe in-memory issue tracker.
#[derive(Clone)]
pub struct InMemoryIssueTracker {
    state: Arc<RwLock<TrackerState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for InMemoryIssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::Unavailable(err.to_string())
}

impl InMemoryIssueTracker {
    /// Creates an empty tracker stamping with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }

    /// Creates an empty tracker stamping with the given clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            state: Arc::new(RwLock::new(TrackerState::default())),
            clock,
        }
    }

    /// Test hook: the next `count` calls of `op` fail as unavailable.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Unavailable`] when internal state is
    /// poisoned.
    pub fn inject_failures(&self, op: TrackerOp, count: u32) -> TrackerResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        state.failures.insert(op, count);
        Ok(())
    }

    /// Test hook: flips an issue's state at an explicit timestamp,
    /// simulating an edit made directly on the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the issue does not exist.
    pub fn set_state_at(
        &self,
        number: IssueNumber,
        state: IssueState,
        at: DateTime<Utc>,
    ) -> TrackerResult<IssueRecord> {
        let mut tracker = self.state.write().map_err(lock_poisoned)?;
        let issue = tracker
            .issues
            .get_mut(&number)
            .ok_or(TrackerError::NotFound(number))?;
        issue.state = state;
        issue.state_changed_at = at;
        Ok(issue.clone())
    }

    fn consume_failure(state: &mut TrackerState, op: TrackerOp) -> TrackerResult<()> {
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(TrackerError::Unavailable("injected failure".to_owned()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IssueTracker for InMemoryIssueTracker {
    async fn create_issue(&self, title: &str, body: Option<&str>) -> TrackerResult<IssueRecord> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TrackerOp::Create)?;
        state.next_number += 1;
        let number = IssueNumber::new(state.next_number).map_err(|err: LinkDomainError| {
            TrackerError::Unavailable(err.to_string())
        })?;
        let record = IssueRecord {
            number,
            title: title.to_owned(),
            body: body.map(str::to_owned),
            state: IssueState::Open,
            state_changed_at: now,
            comments: Vec::new(),
        };
        state.issues.insert(number, record.clone());
        Ok(record)
    }

    async fn get_issue(&self, number: IssueNumber) -> TrackerResult<Option<IssueRecord>> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TrackerOp::Get)?;
        Ok(state.issues.get(&number).cloned())
    }

    async fn list_issues(&self, filter: IssueFilter) -> TrackerResult<Vec<IssueRecord>> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TrackerOp::List)?;
        Ok(state
            .issues
            .values()
            .filter(|issue| filter.state.is_none_or(|wanted| issue.state == wanted))
            .cloned()
            .collect())
    }

    async fn close_issue(&self, number: IssueNumber, comment: Option<&str>) -> TrackerResult<()> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TrackerOp::Close)?;
        let issue = state
            .issues
            .get_mut(&number)
            .ok_or(TrackerError::NotFound(number))?;
        if let Some(body) = comment {
            issue.comments.push(IssueComment {
                body: body.to_owned(),
                created_at: now,
            });
        }
        issue.state = IssueState::Closed;
        issue.state_changed_at = now;
        Ok(())
    }

    async fn reopen_issue(&self, number: IssueNumber) -> TrackerResult<()> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TrackerOp::Reopen)?;
        let issue = state
            .issues
            .get_mut(&number)
            .ok_or(TrackerError::NotFound(number))?;
        issue.state = IssueState::Open;
        issue.state_changed_at = now;
        Ok(())
    }

    async fn add_comment(&self, number: IssueNumber, body: &str) -> TrackerResult<()> {
        let now = self.clock.utc();
        let mut state = self.state.write().map_err(lock_poisoned)?;
        Self::consume_failure(&mut state, TrackerOp::Comment)?;
        let issue = state
            .issues
            .get_mut(&number)
            .ok_or(TrackerError::NotFound(number))?;
        issue.comments.push(IssueComment {
            body: body.to_owned(),
            created_at: now,
        });
        Ok(())
    }
}
