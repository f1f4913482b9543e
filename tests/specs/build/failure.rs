//! Scenario: a nonzero exit fails the build.

use crate::prelude::*;
use wake_core::BuildStatus;

#[tokio::test]
async fn nonzero_exit_ends_in_failed() {
    let h = harness(2).await;
    let mut updates = subscribe(&h, "build:update:");

    let id = submit(&h, job("broken", &["exit 3"])).await;

    let statuses = statuses_until(&mut updates, id, "failed").await;
    assert_eq!(statuses, ["pending", "running", "failed"]);

    let record = wait_for_status(&h, id, BuildStatus::Failed).await;
    assert_eq!(record.tasks[0].status, BuildStatus::Failed);
    assert!(record.artifacts.is_empty());
}

#[tokio::test]
async fn failure_in_the_middle_leaves_later_tasks_pending() {
    let h = harness(2).await;

    let id = submit(&h, job("sequence", &["echo ok", "exit 1", "echo never"])).await;
    let record = wait_for_status(&h, id, BuildStatus::Failed).await;

    assert_eq!(record.tasks[0].status, BuildStatus::Finished);
    assert_eq!(record.tasks[1].status, BuildStatus::Failed);
    assert_eq!(record.tasks[2].status, BuildStatus::Pending);
}
