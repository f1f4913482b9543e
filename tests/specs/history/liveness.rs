//! Liveness reconciliation: records orphaned by a crash heal on read.

use crate::prelude::*;
use std::time::Duration;
use wake_core::BuildStatus;

#[tokio::test]
async fn a_crashed_builds_record_heals_to_aborted() {
    // First process lifetime: start a slow build and "crash" while it
    // is running by tearing the whole stack down mid-flight.
    let dir = {
        let h = harness(2).await;
        let id = submit(&h, job("doomed", &["sleep 30"])).await;
        wait_for_status(&h, id, BuildStatus::Running).await;
        assert_eq!(id, 1);
        let Harness { dir, .. } = h;
        dir
    };

    // Second lifetime over the same directory: the store remembers a
    // running build the fresh queue knows nothing about.
    let h = harness_in(dir, 2).await;
    assert_eq!(
        h.store.get_history(1).unwrap().status,
        BuildStatus::Running
    );
    assert!(!h.queue.contains(1));

    // The feed read repairs it, both in the returned page and, through
    // the bus, in the store.
    let feed = h.engine.feed(10);
    let record = feed.iter().find(|u| u.id == 1).unwrap();
    assert_eq!(record.status, BuildStatus::Aborted);

    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    loop {
        if h.store.get_history(1).map(|u| u.status) == Some(BuildStatus::Aborted) {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "repair never persisted"
        );
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}
