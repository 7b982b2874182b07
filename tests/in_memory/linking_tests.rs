//! Integration tests for link creation, uniqueness, and racing linkers.

use super::helpers::{Harness, harness};
use rstest::rstest;
use tasklink::link::{
    domain::{IssueState, ProjectId, TaskStatus},
    ports::{LinkRegistry, LinkRegistryError},
};
use tasklink::sync::ports::IssueTracker;
use tasklink::sync::services::SyncError;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn linking_seeds_the_snapshot_from_live_state(harness: Harness) {
    let task = harness.seed_task("catch up on backlog").await;
    let issue = harness.seed_issue("catch up on backlog").await;
    harness
        .tracker
        .close_issue(issue.number, None)
        .await
        .expect("close should succeed");

    let link = harness
        .engine
        .link_task_to_issue(task.id, issue.number)
        .await
        .expect("linking should succeed");

    assert_eq!(link.task_status(), TaskStatus::Todo);
    assert_eq!(link.issue_state(), IssueState::Closed);
    assert_eq!(link.last_synced_at(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn linking_an_unknown_issue_fails_without_side_effects(harness: Harness) {
    let task = harness.seed_task("dangling reference").await;
    let number = tasklink::link::domain::IssueNumber::new(77).expect("valid issue number");

    let result = harness.engine.link_task_to_issue(task.id, number).await;

    assert!(matches!(result, Err(SyncError::IssueNotFound(missing)) if missing == number));
    assert!(
        harness
            .registry
            .find_by_task(task.id)
            .await
            .expect("registry lookup should succeed")
            .is_none()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_linkers_admit_exactly_one_winner(harness: Harness) {
    let first = harness.seed_task("claim the issue").await;
    let second = harness.seed_task("claim the issue too").await;
    let issue = harness.seed_issue("contended issue").await;

    let (left, right) = tokio::join!(
        harness.engine.link_task_to_issue(first.id, issue.number),
        harness.engine.link_task_to_issue(second.id, issue.number),
    );

    let winners = usize::from(left.is_ok()) + usize::from(right.is_ok());
    assert_eq!(winners, 1, "exactly one linker may win the race");
    let loser = if left.is_ok() { right } else { left };
    assert!(matches!(
        loser,
        Err(SyncError::Registry(
            LinkRegistryError::DuplicateIssueLink(number)
        )) if number == issue.number
    ));

    let registered = harness
        .registry
        .find_by_issue(issue.number)
        .await
        .expect("registry lookup should succeed")
        .expect("the winner's link should be registered");
    assert_eq!(registered.issue_number(), issue.number);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn imported_issue_synchronizes_like_a_manual_link(harness: Harness) {
    let issue = harness.seed_issue("bug from the wild").await;
    let (task, _) = harness
        .engine
        .create_task_from_issue(issue.number, ProjectId::new())
        .await
        .expect("import should succeed");

    harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await
        .expect("sync should succeed");

    assert_eq!(harness.issue(issue.number).await.state, IssueState::Closed);
}
