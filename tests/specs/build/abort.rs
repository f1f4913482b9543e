//! Scenario: aborting a running build.

use crate::prelude::*;
use std::time::{Duration, Instant};
use wake_core::BuildStatus;
use wake_engine::AbortOutcome;

#[tokio::test]
async fn abort_lands_within_two_seconds() {
    let h = harness(2).await;

    let id = submit(&h, job("stuck", &["sleep 60"])).await;
    wait_for_status(&h, id, BuildStatus::Running).await;

    let started = Instant::now();
    assert_eq!(h.engine.abort(id), AbortOutcome::Signalled);

    let record = wait_for_status(&h, id, BuildStatus::Aborted).await;
    assert!(
        started.elapsed() <= Duration::from_secs(2),
        "abort took {:?}",
        started.elapsed()
    );
    assert_eq!(record.status, BuildStatus::Aborted);

    // Release follows the terminal update.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while h.queue.contains(id) {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}

#[tokio::test]
async fn abort_of_an_unknown_id_reports_not_found() {
    let h = harness(2).await;
    assert_eq!(h.engine.abort(12345), AbortOutcome::NotFound);
}
