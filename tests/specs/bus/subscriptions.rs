//! Subscription prefix law: a client receives exactly the topics that
//! start with one of its prefixes.

use crate::prelude::*;
use std::time::Duration;
use wake_core::BuildStatus;

#[tokio::test]
async fn clients_only_see_matching_topics() {
    let h = harness(2).await;

    let mut update_rx = subscribe(&h, "build:update:");
    let mut log_rx = subscribe(&h, "build:log:");
    let mut all_rx = subscribe(&h, "build:");
    let mut other_rx = subscribe(&h, "job:");

    let id = submit(&h, job("filtered", &["echo hi"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    // Updates-only client: every frame is an update.
    let updates = statuses_until(&mut update_rx, id, "finished").await;
    assert_eq!(updates.first().map(String::as_str), Some("pending"));

    // Logs-only client: exactly the two log frames.
    for expected in [0, 1] {
        let (topic, data) = next_frame(&mut log_rx).await;
        assert_eq!(topic, format!("build:log:{id}"));
        assert_eq!(data["id"], expected);
    }

    // Broad client: both kinds arrive.
    let mut saw_update = false;
    let mut saw_log = false;
    while !(saw_update && saw_log) {
        let (topic, _) = next_frame(&mut all_rx).await;
        saw_update |= topic.starts_with("build:update:");
        saw_log |= topic.starts_with("build:log:");
    }

    // Unrelated prefix: silence.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(other_rx.try_recv().is_err());
}

#[tokio::test]
async fn late_subscribers_miss_earlier_events() {
    let h = harness(2).await;

    let id = submit(&h, job("early", &["echo hi"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    // Attached after the fact: nothing is replayed.
    let mut late_rx = subscribe(&h, "build:");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(late_rx.try_recv().is_err());
}

#[tokio::test]
async fn detached_clients_stop_receiving() {
    let h = harness(2).await;

    let (client, mut rx) = wake_bus::Client::new();
    client.subscribe("build:");
    h.clients.attach(std::sync::Arc::clone(&client));
    h.clients.detach(client.id());

    let id = submit(&h, job("gone", &["true"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}
