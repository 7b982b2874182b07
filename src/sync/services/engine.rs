//! Synchronization orchestration service.
//!
//! The engine drives one sync event at a time through a link: registry
//! lookup, fresh read of the opposite side, state-mapper plan, collaborator
//! mutation under the retry policy, and settled-snapshot bookkeeping.
//! Divergence discovered at mutation time is handed to the conflict rules
//! and re-applied exactly once before the link is parked as conflicted.

use crate::link::{
    domain::{
        IssueNumber, IssueState, Link, LinkDomainError, LinkId, LinkPhase, ProjectId,
        SnapshotUpdate, SyncDirection, SyncLabel, TaskId, TaskStatus,
    },
    ports::{LinkRegistry, LinkRegistryError},
};
use crate::sync::domain::{
    Resolution, SyncChange, SyncEvent, SyncSource,
    mapper::{self, IssuePlan},
    resolve_divergence,
};
use crate::sync::ports::{
    IssueRecord, IssueTracker, TaskDraft, TaskFilter, TaskRecord, TaskStore, TaskStoreError,
    TrackerError,
};
use crate::sync::services::{
    locks::LinkLocks,
    retry::{RetryError, RetryPolicy},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync engine.
///
/// Transient collaborator failures are absorbed and retried internally;
/// only structural failures and retry exhaustion reach the caller.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Link registry rejected the operation (duplicate link, vanished
    /// link, persistence failure).
    #[error(transparent)]
    Registry(#[from] LinkRegistryError),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] LinkDomainError),

    /// The task vanished from the store.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The issue vanished from the tracker.
    #[error("issue not found: {0}")]
    IssueNotFound(IssueNumber),

    /// The tracker stayed unavailable through all retry attempts.
    #[error("tracker unavailable after {attempts} attempts")]
    TrackerUnavailable {
        /// Attempts made before giving up.
        attempts: u32,
        /// The final transient failure.
        #[source]
        source: TrackerError,
    },

    /// The task store stayed unavailable through all retry attempts.
    #[error("task store unavailable after {attempts} attempts")]
    StoreUnavailable {
        /// Attempts made before giving up.
        attempts: u32,
        /// The final transient failure.
        #[source]
        source: TaskStoreError,
    },

    /// Divergence persisted through resolution; the link needs human
    /// attention.
    #[error("link {0} diverged beyond automatic resolution")]
    Conflict(LinkId),

    /// The link is parked in a terminal phase and no longer accepts
    /// events.
    #[error("link {0} no longer accepts events (phase {1:?})")]
    Terminal(LinkId, LinkPhase),
}

/// Outcome of processing a sync event to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The entity is not linked; nothing to synchronize.
    NotLinked,
    /// The snapshot already reflected the event (duplicate delivery).
    Unchanged(Link),
    /// The mapped mutation was applied and the snapshot settled.
    Applied(Link),
    /// Divergence was detected and resolved; the snapshot settled on the
    /// winning side.
    Resolved(Link),
}

/// Synchronization engine over a link registry, a task store, and an
/// issue tracker client.
#[derive(Clone)]
pub struct SyncEngine<R, S, T, C>
where
    R: LinkRegistry,
    S: TaskStore,
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    tasks: Arc<S>,
    tracker: Arc<T>,
    clock: Arc<C>,
    retry: RetryPolicy,
    locks: Arc<LinkLocks>,
}

impl<R, S, T, C> SyncEngine<R, S, T, C>
where
    R: LinkRegistry,
    S: TaskStore,
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates an engine with the default retry policy.
    #[must_use]
    pub fn new(registry: Arc<R>, tasks: Arc<S>, tracker: Arc<T>, clock: Arc<C>) -> Self {
        Self::with_retry_policy(registry, tasks, tracker, clock, RetryPolicy::default())
    }

    /// Creates an engine with an explicit retry policy.
    #[must_use]
    pub fn with_retry_policy(
        registry: Arc<R>,
        tasks: Arc<S>,
        tracker: Arc<T>,
        clock: Arc<C>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            tasks,
            tracker,
            clock,
            retry,
            locks: Arc::new(LinkLocks::new()),
        }
    }

    /// Processes an observed change on either side of a link.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the mapped mutation cannot be applied;
    /// see the individual variants for the failure taxonomy.
    pub async fn process_event(&self, event: SyncEvent) -> SyncResult<SyncOutcome> {
        match event.change() {
            SyncChange::Task { task_id, from, to } => {
                self.process_task_change(task_id, from, to, event.observed_at())
                    .await
            }
            SyncChange::Issue {
                issue_number,
                from,
                to,
            } => {
                self.process_issue_change(issue_number, from, to, event.observed_at())
                    .await
            }
        }
    }

    /// Processes a task status transition observed now.
    ///
    /// A task with no link is a no-op: not every task is tracker-linked.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the remote mutation cannot be applied.
    pub async fn process_task_status_change(
        &self,
        task_id: TaskId,
        old: TaskStatus,
        new: TaskStatus,
    ) -> SyncResult<SyncOutcome> {
        let event = SyncEvent::new(
            SyncChange::Task {
                task_id,
                from: old,
                to: new,
            },
            self.clock.utc(),
        );
        self.process_event(event).await
    }

    /// Processes an issue state transition observed now.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the local mutation cannot be applied.
    pub async fn process_issue_state_change(
        &self,
        issue_number: IssueNumber,
        old: IssueState,
        new: IssueState,
    ) -> SyncResult<SyncOutcome> {
        let event = SyncEvent::new(
            SyncChange::Issue {
                issue_number,
                from: old,
                to: new,
            },
            self.clock.utc(),
        );
        self.process_event(event).await
    }

    /// Links an existing task to an existing issue.
    ///
    /// Validates that neither side already participates in a link, pulls a
    /// fresh snapshot from both sides to seed consistent state, creates the
    /// link, and then persists the `github:<n>` label on the task. Under a
    /// concurrent race the registry guarantees exactly one winner, and a
    /// racer that loses at the registry never labels its task. A label
    /// attach failure rolls the freshly created link back, so the label
    /// set and the registry cannot drift apart.
    ///
    /// # Errors
    ///
    /// Returns [`LinkRegistryError::DuplicateTaskLink`]/
    /// [`LinkRegistryError::DuplicateIssueLink`] (wrapped in
    /// [`SyncError::Registry`]) when either side is already linked — a
    /// task carrying a sync label for a different issue counts as linked —
    /// and not-found/unavailable errors from the snapshot pulls.
    pub async fn link_task_to_issue(
        &self,
        task_id: TaskId,
        issue_number: IssueNumber,
    ) -> SyncResult<Link> {
        if self.registry.find_by_task(task_id).await?.is_some() {
            return Err(LinkRegistryError::DuplicateTaskLink(task_id).into());
        }
        if self.registry.find_by_issue(issue_number).await?.is_some() {
            return Err(LinkRegistryError::DuplicateIssueLink(issue_number).into());
        }

        let task = self
            .fetch_task(task_id)
            .await?
            .ok_or(SyncError::TaskNotFound(task_id))?;
        if let Some(label) = task.sync_label()
            && label.issue_number() != issue_number
        {
            return Err(LinkRegistryError::DuplicateTaskLink(task_id).into());
        }
        let issue = self
            .fetch_issue(issue_number)
            .await?
            .ok_or(SyncError::IssueNotFound(issue_number))?;

        let link = Link::new(task_id, issue_number, task.status, issue.state, &*self.clock);
        self.registry.create(&link).await?;
        if let Err(err) = self
            .attach_label(task_id, SyncLabel::new(issue_number))
            .await
        {
            self.registry.delete(link.id()).await?;
            return Err(err);
        }
        Ok(link)
    }

    /// Creates a task from a remote issue and links the two as one logical
    /// operation.
    ///
    /// Idempotent: an existing link returns the already-linked task, and a
    /// labelled task left behind by a half-completed earlier attempt is
    /// adopted instead of duplicated. The initial status derives from the
    /// issue's current state through the inverse mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::IssueNotFound`] for an unknown issue, registry
    /// duplicates lost to a concurrent race, and collaborator failures.
    pub async fn create_task_from_issue(
        &self,
        issue_number: IssueNumber,
        project_id: ProjectId,
    ) -> SyncResult<(TaskRecord, Link)> {
        if let Some(link) = self.registry.find_by_issue(issue_number).await? {
            let task = self
                .fetch_task(link.task_id())
                .await?
                .ok_or(SyncError::TaskNotFound(link.task_id()))?;
            return Ok((task, link));
        }

        let issue = self
            .fetch_issue(issue_number)
            .await?
            .ok_or(SyncError::IssueNotFound(issue_number))?;
        let label = SyncLabel::new(issue_number);

        let mut orphans = self
            .list_tasks(TaskFilter {
                label: Some(label.to_string()),
                ..TaskFilter::default()
            })
            .await?;
        let task = match orphans.pop() {
            Some(orphan) => orphan,
            None => {
                let draft = TaskDraft {
                    project_id,
                    title: issue.title.clone(),
                    description: issue.body.clone(),
                    status: mapper::task_status_for(issue.state, TaskStatus::Todo),
                    labels: vec![label.to_string()],
                };
                self.create_task(draft).await?
            }
        };

        // A failure past this point leaves the labelled task behind; the
        // next call adopts it instead of creating a duplicate.
        let link = Link::new(task.id, issue_number, task.status, issue.state, &*self.clock);
        self.registry.create(&link).await?;
        Ok((task, link))
    }

    /// Rebuilds missing registry entries by scanning task labels.
    ///
    /// The `github:<n>` label is the durable link representation; this
    /// reconstructs the registry from it after a loss or a half-completed
    /// linking operation. Returns the number of links recreated.
    ///
    /// # Errors
    ///
    /// Returns collaborator and registry failures; tasks whose labelled
    /// issue no longer exists are skipped, not failed.
    pub async fn rebuild_from_labels(&self) -> SyncResult<usize> {
        let tasks = self.list_tasks(TaskFilter::default()).await?;
        let mut rebuilt = 0;
        for task in tasks {
            let Some(label) = task.sync_label() else {
                continue;
            };
            if self.registry.find_by_task(task.id).await?.is_some()
                || self
                    .registry
                    .find_by_issue(label.issue_number())
                    .await?
                    .is_some()
            {
                continue;
            }
            let Some(issue) = self.fetch_issue(label.issue_number()).await? else {
                continue;
            };
            let link = Link::new(
                task.id,
                label.issue_number(),
                task.status,
                issue.state,
                &*self.clock,
            );
            match self.registry.create(&link).await {
                Ok(()) => rebuilt += 1,
                Err(
                    LinkRegistryError::DuplicateTaskLink(_)
                    | LinkRegistryError::DuplicateIssueLink(_),
                ) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(rebuilt)
    }

    async fn process_task_change(
        &self,
        task_id: TaskId,
        old: TaskStatus,
        new: TaskStatus,
        observed_at: DateTime<Utc>,
    ) -> SyncResult<SyncOutcome> {
        let Some(found) = self.registry.find_by_task(task_id).await? else {
            return Ok(SyncOutcome::NotLinked);
        };
        let _guard = self.locks.acquire(found.id()).await;
        // Re-read under the lock; the link may have settled or vanished.
        let Some(link) = self.registry.find_by_task(task_id).await? else {
            return Ok(SyncOutcome::NotLinked);
        };
        if !link.phase().accepts_events() {
            return Err(SyncError::Terminal(link.id(), link.phase()));
        }
        if link.task_status() == new {
            return Ok(SyncOutcome::Unchanged(link));
        }

        self.registry
            .set_phase(link.id(), LinkPhase::Syncing, self.clock.utc())
            .await?;

        let Some(issue) = self.fetch_issue(link.issue_number()).await? else {
            self.registry
                .set_phase(link.id(), LinkPhase::Broken, self.clock.utc())
                .await?;
            return Err(SyncError::IssueNotFound(link.issue_number()));
        };

        if issue.state != link.issue_state() {
            // The issue moved independently since the last settled sync.
            let task = self
                .fetch_task(task_id)
                .await?
                .ok_or(SyncError::TaskNotFound(task_id))?;
            let resolution = resolve_divergence(
                task.status,
                observed_at,
                issue.state,
                issue.state_changed_at,
            );
            return self.apply_resolution(&link, &resolution, &task, &issue).await;
        }

        let plan = mapper::plan_issue_mutation(old, new);
        self.apply_issue_plan(link.issue_number(), &plan).await?;
        let settled = self
            .settle(
                &link,
                SnapshotUpdate {
                    task_status: Some(new),
                    issue_state: plan.target_state.or(Some(issue.state)),
                    direction: SyncDirection::LocalToRemote,
                    synced_at: self.clock.utc(),
                },
            )
            .await?;
        Ok(SyncOutcome::Applied(settled))
    }

    async fn process_issue_change(
        &self,
        issue_number: IssueNumber,
        old: IssueState,
        new: IssueState,
        observed_at: DateTime<Utc>,
    ) -> SyncResult<SyncOutcome> {
        let Some(found) = self.registry.find_by_issue(issue_number).await? else {
            return Ok(SyncOutcome::NotLinked);
        };
        let _guard = self.locks.acquire(found.id()).await;
        // Re-read under the lock; the link may have settled or vanished.
        let Some(link) = self.registry.find_by_issue(issue_number).await? else {
            return Ok(SyncOutcome::NotLinked);
        };
        if !link.phase().accepts_events() {
            return Err(SyncError::Terminal(link.id(), link.phase()));
        }
        if link.issue_state() == new {
            return Ok(SyncOutcome::Unchanged(link));
        }

        self.registry
            .set_phase(link.id(), LinkPhase::Syncing, self.clock.utc())
            .await?;

        let Some(task) = self.fetch_task(link.task_id()).await? else {
            self.registry
                .set_phase(link.id(), LinkPhase::Broken, self.clock.utc())
                .await?;
            return Err(SyncError::TaskNotFound(link.task_id()));
        };

        if task.status != link.task_status() {
            // The task moved independently since the last settled sync.
            let issue = self
                .fetch_issue(issue_number)
                .await?
                .ok_or(SyncError::IssueNotFound(issue_number))?;
            let resolution = resolve_divergence(
                task.status,
                task.last_transition_at(),
                issue.state,
                observed_at,
            );
            return self.apply_resolution(&link, &resolution, &task, &issue).await;
        }

        let target = mapper::plan_task_mutation(old, new, task.status);
        if let Some(status) = target {
            self.update_task(link.task_id(), status).await?;
        }
        let settled = self
            .settle(
                &link,
                SnapshotUpdate {
                    task_status: Some(target.unwrap_or(task.status)),
                    issue_state: Some(new),
                    direction: SyncDirection::RemoteToLocal,
                    synced_at: self.clock.utc(),
                },
            )
            .await?;
        Ok(SyncOutcome::Applied(settled))
    }

    /// Applies a computed resolution, verifying the mutated side once.
    ///
    /// A second mismatch parks the link as conflicted: the engine never
    /// loops chasing a moving target.
    async fn apply_resolution(
        &self,
        link: &Link,
        resolution: &Resolution,
        observed_task: &TaskRecord,
        observed_issue: &IssueRecord,
    ) -> SyncResult<SyncOutcome> {
        match resolution.winner {
            SyncSource::Task => {
                if observed_issue.state != resolution.issue_state {
                    self.move_issue(
                        link.issue_number(),
                        resolution.issue_state,
                        resolution.comment.as_deref(),
                    )
                    .await?;
                }
                let verified = self
                    .fetch_issue(link.issue_number())
                    .await?
                    .ok_or(SyncError::IssueNotFound(link.issue_number()))?;
                if verified.state != resolution.issue_state {
                    self.registry
                        .set_phase(link.id(), LinkPhase::Conflicted, self.clock.utc())
                        .await?;
                    return Err(SyncError::Conflict(link.id()));
                }
            }
            SyncSource::Issue => {
                if observed_task.status != resolution.task_status {
                    self.update_task(link.task_id(), resolution.task_status)
                        .await?;
                }
                let verified = self
                    .fetch_task(link.task_id())
                    .await?
                    .ok_or(SyncError::TaskNotFound(link.task_id()))?;
                if verified.status != resolution.task_status {
                    self.registry
                        .set_phase(link.id(), LinkPhase::Conflicted, self.clock.utc())
                        .await?;
                    return Err(SyncError::Conflict(link.id()));
                }
            }
        }

        let settled = self
            .settle(
                link,
                SnapshotUpdate {
                    task_status: Some(resolution.task_status),
                    issue_state: Some(resolution.issue_state),
                    direction: resolution.direction,
                    synced_at: self.clock.utc(),
                },
            )
            .await?;
        Ok(SyncOutcome::Resolved(settled))
    }

    /// Records the settled snapshot and moves the link to `Synced`.
    async fn settle(&self, link: &Link, update: SnapshotUpdate) -> SyncResult<Link> {
        self.registry.update_snapshot(link.id(), update).await?;
        let settled = self
            .registry
            .set_phase(link.id(), LinkPhase::Synced, self.clock.utc())
            .await?;
        Ok(settled)
    }

    /// Applies a state-mapper plan to the remote issue. Comments land
    /// before or with the state change so transitions are always
    /// announced.
    async fn apply_issue_plan(&self, number: IssueNumber, plan: &IssuePlan) -> SyncResult<()> {
        match plan.target_state {
            Some(IssueState::Closed) => {
                self.move_issue(number, IssueState::Closed, plan.comment.as_deref())
                    .await?;
            }
            Some(IssueState::Open) => {
                self.move_issue(number, IssueState::Open, plan.comment.as_deref())
                    .await?;
            }
            None => {
                if let Some(comment) = plan.comment.as_deref() {
                    self.post_comment(number, comment).await?;
                }
            }
        }
        Ok(())
    }

    /// Moves the issue to the target state, carrying the transition
    /// comment (close comments ride the close call; reopens comment
    /// afterwards).
    async fn move_issue(
        &self,
        number: IssueNumber,
        target: IssueState,
        comment: Option<&str>,
    ) -> SyncResult<()> {
        match target {
            IssueState::Closed => {
                let tracker = Arc::clone(&self.tracker);
                self.retry
                    .run(|| {
                        let tracker = Arc::clone(&tracker);
                        async move { tracker.close_issue(number, comment).await }
                    })
                    .await
                    .map_err(tracker_error)?;
            }
            IssueState::Open => {
                let tracker = Arc::clone(&self.tracker);
                self.retry
                    .run(|| {
                        let tracker = Arc::clone(&tracker);
                        async move { tracker.reopen_issue(number).await }
                    })
                    .await
                    .map_err(tracker_error)?;
                if let Some(body) = comment {
                    self.post_comment(number, body).await?;
                }
            }
        }
        Ok(())
    }

    async fn post_comment(&self, number: IssueNumber, body: &str) -> SyncResult<()> {
        let tracker = Arc::clone(&self.tracker);
        self.retry
            .run(|| {
                let tracker = Arc::clone(&tracker);
                async move { tracker.add_comment(number, body).await }
            })
            .await
            .map_err(tracker_error)
    }

    async fn fetch_issue(&self, number: IssueNumber) -> SyncResult<Option<IssueRecord>> {
        let tracker = Arc::clone(&self.tracker);
        self.retry
            .run(|| {
                let tracker = Arc::clone(&tracker);
                async move { tracker.get_issue(number).await }
            })
            .await
            .map_err(tracker_error)
    }

    async fn fetch_task(&self, id: TaskId) -> SyncResult<Option<TaskRecord>> {
        let tasks = Arc::clone(&self.tasks);
        self.retry
            .run(|| {
                let tasks = Arc::clone(&tasks);
                async move { tasks.get_task(id).await }
            })
            .await
            .map_err(store_error)
    }

    async fn update_task(&self, id: TaskId, status: TaskStatus) -> SyncResult<TaskRecord> {
        let tasks = Arc::clone(&self.tasks);
        self.retry
            .run(|| {
                let tasks = Arc::clone(&tasks);
                async move { tasks.update_status(id, status).await }
            })
            .await
            .map_err(store_error)
    }

    async fn create_task(&self, draft: TaskDraft) -> SyncResult<TaskRecord> {
        let tasks = Arc::clone(&self.tasks);
        self.retry
            .run(|| {
                let tasks = Arc::clone(&tasks);
                let draft = draft.clone();
                async move { tasks.create_task(draft).await }
            })
            .await
            .map_err(store_error)
    }

    async fn list_tasks(&self, filter: TaskFilter) -> SyncResult<Vec<TaskRecord>> {
        let tasks = Arc::clone(&self.tasks);
        self.retry
            .run(|| {
                let tasks = Arc::clone(&tasks);
                let filter = filter.clone();
                async move { tasks.list_tasks(filter).await }
            })
            .await
            .map_err(store_error)
    }

    async fn attach_label(&self, id: TaskId, label: SyncLabel) -> SyncResult<()> {
        let tasks = Arc::clone(&self.tasks);
        self.retry
            .run(|| {
                let tasks = Arc::clone(&tasks);
                async move { tasks.add_label(id, label).await }
            })
            .await
            .map_err(store_error)
    }
}

/// Maps a retried tracker failure to the engine taxonomy.
fn tracker_error(err: RetryError<TrackerError>) -> SyncError {
    match err {
        RetryError::Permanent(TrackerError::NotFound(number)) => SyncError::IssueNotFound(number),
        RetryError::Permanent(source) => SyncError::TrackerUnavailable {
            attempts: 1,
            source,
        },
        RetryError::Exhausted { attempts, last } => SyncError::TrackerUnavailable {
            attempts,
            source: last,
        },
    }
}

/// Maps a retried task store failure to the engine taxonomy.
fn store_error(err: RetryError<TaskStoreError>) -> SyncError {
    match err {
        RetryError::Permanent(TaskStoreError::NotFound(id)) => SyncError::TaskNotFound(id),
        RetryError::Permanent(source) => SyncError::StoreUnavailable {
            attempts: 1,
            source,
        },
        RetryError::Exhausted { attempts, last } => SyncError::StoreUnavailable {
            attempts,
            source: last,
        },
    }
}
