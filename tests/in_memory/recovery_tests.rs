//! Integration tests for transient outages, replay, and registry rebuild.

use super::helpers::{Harness, harness};
use rstest::rstest;
use tasklink::link::{
    domain::{IssueState, LinkPhase, TaskStatus},
    ports::LinkRegistry,
};
use tasklink::sync::{
    adapters::memory::TrackerOp,
    ports::TaskStore,
    services::{SyncError, SyncOutcome},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_brief_tracker_outage_is_invisible_to_the_caller(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;
    harness
        .tracker
        .inject_failures(TrackerOp::Close, 2)
        .expect("failure injection should succeed");

    let outcome = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("the retried close should succeed");

    assert!(matches!(outcome, SyncOutcome::Applied(_)));
    let remote = harness.issue(issue.number).await;
    assert_eq!(remote.state, IssueState::Closed);
    assert_eq!(remote.comments.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn an_exhausted_outage_can_be_replayed_once_service_returns(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;
    harness
        .tracker
        .inject_failures(TrackerOp::Close, 10)
        .expect("failure injection should succeed");

    let failed = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await;
    assert!(matches!(
        failed,
        Err(SyncError::TrackerUnavailable { attempts: 3, .. })
    ));
    assert_eq!(
        harness.link_for_task(task.id).await.phase(),
        LinkPhase::Syncing
    );

    // Service returns; the same delivery now lands.
    harness
        .tracker
        .inject_failures(TrackerOp::Close, 0)
        .expect("failure reset should succeed");
    let outcome = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("the replay should succeed");

    assert!(matches!(outcome, SyncOutcome::Applied(_)));
    let remote = harness.issue(issue.number).await;
    assert_eq!(remote.state, IssueState::Closed);
    assert_eq!(remote.comments.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rebuilt_links_synchronize_like_the_originals(harness: Harness) {
    let (task, issue, link) = harness.seed_linked_pair().await;
    harness
        .registry
        .delete(link.id())
        .await
        .expect("delete should succeed");

    let rebuilt = harness
        .engine
        .rebuild_from_labels()
        .await
        .expect("rebuild should succeed");
    assert_eq!(rebuilt, 1);

    harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("sync through the rebuilt link should succeed");
    assert_eq!(harness.issue(issue.number).await.state, IssueState::Closed);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rebuild_skips_labels_whose_issue_is_gone(harness: Harness) {
    let task = harness.seed_task("points at a deleted issue").await;
    let number = tasklink::link::domain::IssueNumber::new(999).expect("valid issue number");
    harness
        .store
        .add_label(task.id, tasklink::link::domain::SyncLabel::new(number))
        .await
        .expect("label attach should succeed");

    let rebuilt = harness
        .engine
        .rebuild_from_labels()
        .await
        .expect("rebuild should succeed");

    assert_eq!(rebuilt, 0);
    assert!(
        harness
            .registry
            .find_by_task(task.id)
            .await
            .expect("registry lookup should succeed")
            .is_none()
    );
}
