//! Shared test helpers for in-memory sync engine integration tests.

use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;
use tasklink::link::{
    adapters::memory::InMemoryLinkRegistry,
    domain::{IssueNumber, Link, ProjectId, TaskId, TaskStatus},
    ports::LinkRegistry,
};
use tasklink::sync::{
    adapters::memory::{InMemoryIssueTracker, InMemoryTaskStore},
    ports::{IssueRecord, IssueTracker, TaskDraft, TaskRecord, TaskStore},
    services::{RetryPolicy, SyncEngine},
};

/// Engine wired to the in-memory adapters.
pub type TestEngine =
    SyncEngine<InMemoryLinkRegistry, InMemoryTaskStore, InMemoryIssueTracker, DefaultClock>;

/// A fully wired engine plus direct handles to its collaborators.
pub struct Harness {
    pub registry: Arc<InMemoryLinkRegistry>,
    pub store: Arc<InMemoryTaskStore>,
    pub tracker: Arc<InMemoryIssueTracker>,
    pub engine: TestEngine,
}

/// Provides a fresh harness with millisecond-scale retry backoffs.
#[fixture]
pub fn harness() -> Harness {
    let registry = Arc::new(InMemoryLinkRegistry::new());
    let store = Arc::new(InMemoryTaskStore::new());
    let tracker = Arc::new(InMemoryIssueTracker::new());
    let engine = SyncEngine::with_retry_policy(
        Arc::clone(&registry),
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::new(DefaultClock),
        RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(4),
            Duration::from_secs(1),
        ),
    );
    Harness {
        registry,
        store,
        tracker,
        engine,
    }
}

impl Harness {
    /// Seeds a `todo` task with the given title.
    pub async fn seed_task(&self, title: &str) -> TaskRecord {
        self.store
            .create_task(TaskDraft {
                project_id: ProjectId::new(),
                title: title.to_owned(),
                description: None,
                status: TaskStatus::Todo,
                labels: Vec::new(),
            })
            .await
            .expect("task creation should succeed")
    }

    /// Seeds an open issue with the given title.
    pub async fn seed_issue(&self, title: &str) -> IssueRecord {
        self.tracker
            .create_issue(title, None)
            .await
            .expect("issue creation should succeed")
    }

    /// Seeds a task and an issue and links them.
    pub async fn seed_linked_pair(&self) -> (TaskRecord, IssueRecord, Link) {
        let task = self.seed_task("wire the importer").await;
        let issue = self.seed_issue("wire the importer").await;
        let link = self
            .engine
            .link_task_to_issue(task.id, issue.number)
            .await
            .expect("linking should succeed");
        (task, issue, link)
    }

    /// Fetches the current state of an issue that must exist.
    pub async fn issue(&self, number: IssueNumber) -> IssueRecord {
        self.tracker
            .get_issue(number)
            .await
            .expect("issue lookup should succeed")
            .expect("issue should exist")
    }

    /// Fetches the current state of a task that must exist.
    pub async fn task(&self, id: TaskId) -> TaskRecord {
        self.store
            .get_task(id)
            .await
            .expect("task lookup should succeed")
            .expect("task should exist")
    }

    /// Fetches the link currently registered for a task.
    pub async fn link_for_task(&self, id: TaskId) -> Link {
        self.registry
            .find_by_task(id)
            .await
            .expect("registry lookup should succeed")
            .expect("link should exist")
    }
}
