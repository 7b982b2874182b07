//! Integration tests for divergence arbitration.

use super::helpers::{Harness, harness};
use chrono::{DateTime, TimeZone, Utc};
use mockable::{Clock, DefaultClock};
use rstest::rstest;
use tasklink::link::{
    domain::{IssueState, LinkPhase, SyncDirection, TaskStatus},
    ports::LinkRegistry,
};
use tasklink::sync::{
    domain::{SyncChange, SyncEvent},
    services::{SyncError, SyncOutcome},
};

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 14, 16, 0, second)
        .single()
        .expect("valid timestamp")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn simultaneous_edits_settle_on_the_task_side(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;
    let instant = at(0);
    harness
        .store
        .set_status_at(task.id, TaskStatus::InProgress, instant)
        .expect("status edit should succeed");
    harness
        .tracker
        .set_state_at(issue.number, IssueState::Closed, instant)
        .expect("state edit should succeed");

    let outcome = harness
        .engine
        .process_event(SyncEvent::new(
            SyncChange::Task {
                task_id: task.id,
                from: TaskStatus::Todo,
                to: TaskStatus::InProgress,
            },
            instant,
        ))
        .await
        .expect("arbitration should succeed");

    let settled = match outcome {
        SyncOutcome::Resolved(link) => link,
        other => panic!("expected Resolved, got {other:?}"),
    };
    assert_eq!(settled.phase(), LinkPhase::Synced);
    assert_eq!(settled.direction(), Some(SyncDirection::LocalToRemote));
    assert_eq!(harness.issue(issue.number).await.state, IssueState::Open);
    assert_eq!(harness.task(task.id).await.status, TaskStatus::InProgress);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn the_later_edit_wins_regardless_of_which_side_reported(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;
    harness
        .store
        .set_status_at(task.id, TaskStatus::InProgress, at(10))
        .expect("status edit should succeed");
    harness
        .tracker
        .set_state_at(issue.number, IssueState::Closed, at(20))
        .expect("state edit should succeed");

    // The task side reports first, but the issue edit is more recent.
    let outcome = harness
        .engine
        .process_event(SyncEvent::new(
            SyncChange::Task {
                task_id: task.id,
                from: TaskStatus::Todo,
                to: TaskStatus::InProgress,
            },
            at(10),
        ))
        .await
        .expect("arbitration should succeed");

    assert!(matches!(outcome, SyncOutcome::Resolved(_)));
    assert_eq!(harness.task(task.id).await.status, TaskStatus::Done);
    assert_eq!(harness.issue(issue.number).await.state, IssueState::Closed);
    let link = harness.link_for_task(task.id).await;
    assert_eq!(link.direction(), Some(SyncDirection::RemoteToLocal));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn arbitration_is_deterministic_across_replays(harness: Harness) {
    let (task, issue, _) = harness.seed_linked_pair().await;
    let instant = at(0);
    harness
        .store
        .set_status_at(task.id, TaskStatus::Done, instant)
        .expect("status edit should succeed");
    harness
        .tracker
        .set_state_at(issue.number, IssueState::Closed, instant)
        .expect("state edit should succeed");

    let event = SyncEvent::new(
        SyncChange::Task {
            task_id: task.id,
            from: TaskStatus::Todo,
            to: TaskStatus::Done,
        },
        instant,
    );
    let first = harness
        .engine
        .process_event(event)
        .await
        .expect("arbitration should succeed");
    let second = harness
        .engine
        .process_event(event)
        .await
        .expect("replay should succeed");

    // Both sides already agreed on completion, so the winner changes
    // nothing remotely and the replay is absorbed.
    assert!(matches!(first, SyncOutcome::Resolved(_)));
    assert!(matches!(second, SyncOutcome::Unchanged(_)));
    assert_eq!(harness.issue(issue.number).await.state, IssueState::Closed);
    assert_eq!(harness.issue(issue.number).await.comments.len(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parked_conflicts_stay_parked_until_someone_intervenes(harness: Harness) {
    let (task, _, link) = harness.seed_linked_pair().await;
    harness
        .registry
        .set_phase(link.id(), LinkPhase::Conflicted, DefaultClock.utc())
        .await
        .expect("phase change should succeed");

    let result = harness
        .engine
        .process_task_status_change(task.id, TaskStatus::Todo, TaskStatus::Done)
        .await;

    assert!(matches!(
        result,
        Err(SyncError::Terminal(id, LinkPhase::Conflicted)) if id == link.id()
    ));
    assert_eq!(
        harness.link_for_task(task.id).await.phase(),
        LinkPhase::Conflicted
    );
}
