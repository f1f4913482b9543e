//! Build ids increase monotonically and survive restarts.

use crate::prelude::*;
use wake_core::BuildStatus;

#[tokio::test]
async fn ids_follow_submission_order() {
    let h = harness(2).await;

    let mut previous = 0;
    for name in ["a", "b", "c", "d"] {
        let id = submit(&h, job(name, &["true"])).await;
        assert!(id > previous, "id {id} does not exceed {previous}");
        previous = id;
    }
}

#[tokio::test]
async fn ids_are_not_reused_after_a_restart() {
    let h = harness(2).await;
    let last = {
        let first = submit(&h, job("a", &["true"])).await;
        let second = submit(&h, job("b", &["true"])).await;
        wait_for_status(&h, first, BuildStatus::Finished).await;
        wait_for_status(&h, second, BuildStatus::Finished).await;
        second
    };

    // Restart: same working directory, fresh process state.
    let Harness { dir, .. } = h;
    let h = harness_in(dir, 2).await;

    let next = submit(&h, job("c", &["true"])).await;
    assert!(next > last, "id {next} reused after restart (last was {last})");
}
