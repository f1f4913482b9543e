//! Terminal statuses absorb: nothing is emitted or persisted after them.

use crate::prelude::*;
use std::time::Duration;
use wake_core::BuildStatus;
use wake_engine::AbortOutcome;

#[tokio::test]
async fn finished_builds_ignore_late_aborts() {
    let h = harness(2).await;
    let mut updates = subscribe(&h, "build:update:");

    let id = submit(&h, job("done", &["true"])).await;
    let statuses = statuses_until(&mut updates, id, "finished").await;
    assert_eq!(statuses.last().map(String::as_str), Some("finished"));

    // The queue no longer tracks the build, so an abort is not-found
    // and neither history nor the stream change.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while h.queue.contains(id) {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
    assert_eq!(h.engine.abort(id), AbortOutcome::NotFound);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        h.store.get_history(id).unwrap().status,
        BuildStatus::Finished
    );
    assert!(
        updates.try_recv().is_err(),
        "no update may follow a terminal status"
    );
}
