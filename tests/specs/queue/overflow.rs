//! Scenario: submissions beyond the concurrency bound wait their turn.

use crate::prelude::*;
use std::time::Duration;
use wake_core::BuildStatus;

#[tokio::test]
async fn two_run_one_waits_then_fifo_promotion() {
    let h = harness(2).await;

    let first = submit(&h, job("a", &["sleep 0.5"])).await;
    let second = submit(&h, job("b", &["sleep 0.5"])).await;
    let third = submit(&h, job("c", &["sleep 0.5"])).await;

    wait_for_status(&h, first, BuildStatus::Running).await;
    wait_for_status(&h, second, BuildStatus::Running).await;
    wait_for_status(&h, third, BuildStatus::Pending).await;

    // Shortly after submission: exactly two running, one pending.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.queue.running_count(), 2);
    assert_eq!(h.queue.waiting_count(), 1);
    assert_eq!(
        h.store.get_history(third).unwrap().status,
        BuildStatus::Pending
    );

    // The waiter is promoted as capacity frees, and everything drains.
    wait_for_status(&h, third, BuildStatus::Running).await;
    for id in [first, second, third] {
        wait_for_status(&h, id, BuildStatus::Finished).await;
    }
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while h.queue.running_count() > 0 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}

#[tokio::test]
async fn running_builds_never_exceed_the_bound() {
    let h = harness(2).await;
    let mut updates = subscribe(&h, "build:update:");

    let mut ids = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        ids.push(submit(&h, job(name, &["sleep 0.1"])).await);
    }
    for &id in &ids {
        wait_for_status(&h, id, BuildStatus::Finished).await;
    }

    // Replay the full update stream and track the running set.
    let mut running = std::collections::HashSet::new();
    let mut finished = 0usize;
    while finished < ids.len() {
        let (_, data) = next_frame(&mut updates).await;
        let id = data["id"].as_u64().unwrap();
        match data["status"].as_str().unwrap() {
            "running" => {
                running.insert(id);
                assert!(running.len() <= 2, "concurrency bound exceeded: {running:?}");
            }
            "finished" => {
                if running.remove(&id) {
                    finished += 1;
                }
            }
            _ => {}
        }
    }
}
