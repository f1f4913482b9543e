//! Scenario: submission overrides reach the task environment.

use crate::prelude::*;
use wake_core::{BuildStatus, ParamMap};

#[tokio::test]
async fn override_replaces_the_default_value() {
    let h = harness(2).await;
    let mut logs = subscribe(&h, "build:log:");

    let mut spec = job("env", &["echo $K"]);
    spec.params = vec![[("K".to_string(), "a".to_string())].into_iter().collect()];
    let overrides: ParamMap = [("K".to_string(), "b".to_string())].into_iter().collect();

    let id = submit_with(&h, spec, &overrides).await;
    let record = wait_for_status(&h, id, BuildStatus::Finished).await;

    // The record's params carry the override too.
    assert_eq!(record.params[0].get("K").map(String::as_str), Some("b"));

    let (_, command) = next_frame(&mut logs).await;
    assert_eq!(command["id"], 0);
    let (_, line) = next_frame(&mut logs).await;
    assert_eq!(line["id"], 1);
    assert_eq!(line["data"], "b");
}

#[tokio::test]
async fn later_param_maps_override_earlier_ones() {
    let h = harness(2).await;
    let mut logs = subscribe(&h, "build:log:");

    let mut spec = job("layered", &["echo $K"]);
    spec.params = vec![
        [("K".to_string(), "first".to_string())].into_iter().collect(),
        [("K".to_string(), "second".to_string())].into_iter().collect(),
    ];

    let id = submit(&h, spec).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    let (_, command) = next_frame(&mut logs).await;
    assert_eq!(command["id"], 0);
    let (_, line) = next_frame(&mut logs).await;
    assert_eq!(line["data"], "second");
}
