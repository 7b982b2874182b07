//! Integration tests for bidirectional status propagation.

use super::helpers::{Harness, harness};
use rstest::rstest;
use tasklink::link::domain::{IssueState, LinkPhase, TaskStatus};
use tasklink::sync::ports::{IssueTracker, TaskStore};
use tasklink::sync::services::SyncOutcome;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_and_reopen_round_trip(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;

    // Local completion closes the remote issue.
    harness
        .store
        .update_status(task.id, TaskStatus::Done)
        .await
        .expect("status update should succeed");
    harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("outbound sync should succeed");
    assert_eq!(harness.issue(issue.number).await.state, IssueState::Closed);

    // A remote reopen flows back and resets the task.
    harness
        .tracker
        .reopen_issue(issue.number)
        .await
        .expect("reopen should succeed");
    harness
        .engine
        .process_issue_state_change(issue.number, IssueState::Closed, IssueState::Open)
        .await
        .expect("inbound sync should succeed");

    let refreshed = harness.task(task.id).await;
    assert_eq!(refreshed.status, TaskStatus::Todo);

    let link = harness.link_for_task(task.id).await;
    assert_eq!(link.phase(), LinkPhase::Synced);
    assert_eq!(link.task_status(), TaskStatus::Todo);
    assert_eq!(link.issue_state(), IssueState::Open);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn starting_work_announces_without_moving_the_issue(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;

    let outcome = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::InProgress)
        .await
        .expect("sync should succeed");

    assert!(matches!(outcome, SyncOutcome::Applied(_)));
    let remote = harness.issue(issue.number).await;
    assert_eq!(remote.state, IssueState::Open);
    assert_eq!(remote.comments.len(), 1);
    assert_eq!(remote.comments[0].body, "status changed to in_progress");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn abandoning_work_in_progress_is_silent(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;
    harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::InProgress)
        .await
        .expect("sync should succeed");

    let outcome = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::InProgress, TaskStatus::Todo)
        .await
        .expect("sync should succeed");

    assert!(matches!(outcome, SyncOutcome::Applied(_)));
    let remote = harness.issue(issue.number).await;
    assert_eq!(remote.state, IssueState::Open);
    // Only the earlier in_progress announcement; the retreat says nothing.
    assert_eq!(remote.comments.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replayed_deliveries_apply_exactly_once(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;

    let first = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("first delivery should succeed");
    let second = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("replay should succeed");
    let third = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("replay should succeed");

    assert!(matches!(first, SyncOutcome::Applied(_)));
    assert!(matches!(second, SyncOutcome::Unchanged(_)));
    assert!(matches!(third, SyncOutcome::Unchanged(_)));

    let remote = harness.issue(issue.number).await;
    assert_eq!(remote.state, IssueState::Closed);
    assert_eq!(remote.comments.len(), 1);
}
