//! In-memory registry for link lifecycle tests and derived-index rebuilds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::link::{
    domain::{IssueNumber, Link, LinkId, LinkPhase, SnapshotUpdate, TaskId},
    ports::{LinkRegistry, LinkRegistryError, LinkRegistryResult},
};

/// Thread-safe in-memory link registry.
///
/// Duplicate checks and index maintenance happen under a single write
/// lock, giving the exactly-one-winner guarantee for concurrent creates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLinkRegistry {
    state: Arc<RwLock<InMemoryLinkState>>,
}

#[derive(Debug, Default)]
struct InMemoryLinkState {
    links: HashMap<LinkId, Link>,
    task_index: HashMap<TaskId, LinkId>,
    issue_index: HashMap<IssueNumber, LinkId>,
}

impl InMemoryLinkRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned(err: impl std::fmt::Display) -> LinkRegistryError {
    LinkRegistryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl LinkRegistry for InMemoryLinkRegistry {
    async fn create(&self, link: &Link) -> LinkRegistryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if state.task_index.contains_key(&link.task_id()) {
            return Err(LinkRegistryError::DuplicateTaskLink(link.task_id()));
        }
        if state.issue_index.contains_key(&link.issue_number()) {
            return Err(LinkRegistryError::DuplicateIssueLink(link.issue_number()));
        }

        state.task_index.insert(link.task_id(), link.id());
        state.issue_index.insert(link.issue_number(), link.id());
        state.links.insert(link.id(), link.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: LinkId) -> LinkRegistryResult<Option<Link>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        Ok(state.links.get(&id).cloned())
    }

    async fn find_by_task(&self, task_id: TaskId) -> LinkRegistryResult<Option<Link>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let link = state
            .task_index
            .get(&task_id)
            .and_then(|link_id| state.links.get(link_id))
            .cloned();
        Ok(link)
    }

    async fn find_by_issue(&self, issue_number: IssueNumber) -> LinkRegistryResult<Option<Link>> {
        let state = self.state.read().map_err(lock_poisoned)?;
        let link = state
            .issue_index
            .get(&issue_number)
            .and_then(|link_id| state.links.get(link_id))
            .cloned();
        Ok(link)
    }

    async fn update_snapshot(
        &self,
        id: LinkId,
        update: SnapshotUpdate,
    ) -> LinkRegistryResult<Link> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let link = state
            .links
            .get_mut(&id)
            .ok_or(LinkRegistryError::NotFound(id))?;
        link.apply_snapshot(&update);
        Ok(link.clone())
    }

    async fn set_phase(
        &self,
        id: LinkId,
        phase: LinkPhase,
        at: DateTime<Utc>,
    ) -> LinkRegistryResult<Link> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        let link = state
            .links
            .get_mut(&id)
            .ok_or(LinkRegistryError::NotFound(id))?;
        link.set_phase(phase, at);
        Ok(link.clone())
    }

    async fn delete(&self, id: LinkId) -> LinkRegistryResult<()> {
        let mut state = self.state.write().map_err(lock_poisoned)?;
        if let Some(link) = state.links.remove(&id) {
            state.task_index.remove(&link.task_id());
            state.issue_index.remove(&link.issue_number());
        }
        Ok(())
    }
}
