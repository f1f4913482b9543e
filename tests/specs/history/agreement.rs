//! Broadcast lifecycle events agree with the persisted history.

use crate::prelude::*;
use wake_core::{BuildStatus, BuildUpdate};

#[tokio::test]
async fn the_terminal_event_equals_the_stored_record() {
    let h = harness(2).await;
    let mut updates = subscribe(&h, "build:update:");

    let mut spec = job("agree", &["echo out > a.txt"]);
    spec.artifacts = vec!["a.txt".to_string()];
    let id = submit(&h, spec).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    // Walk the stream to the terminal frame and decode its payload.
    let mut terminal: Option<BuildUpdate> = None;
    while terminal.is_none() {
        let (topic, data) = next_frame(&mut updates).await;
        assert_eq!(topic, format!("build:update:{id}"));
        let update: BuildUpdate = serde_json::from_value(data).unwrap();
        if update.status == BuildStatus::Finished {
            terminal = Some(update);
        }
    }

    let stored = h.store.get_history(id).unwrap();
    assert_eq!(terminal.unwrap(), stored);
}

#[tokio::test]
async fn every_event_is_a_full_snapshot() {
    let h = harness(2).await;
    let mut updates = subscribe(&h, "build:update:");

    let id = submit(&h, job("snapshots", &["true", "true"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    loop {
        let (_, data) = next_frame(&mut updates).await;
        let update: BuildUpdate = serde_json::from_value(data).unwrap();
        assert_eq!(update.id, id);
        assert_eq!(update.name, "snapshots");
        assert_eq!(update.tasks.len(), 2, "snapshots always carry every task");
        if update.status == BuildStatus::Finished {
            break;
        }
    }
}
