//! Log replay: late clients recover a task's output from its log file.

use crate::prelude::*;
use wake_core::BuildStatus;
use wake_engine::EngineError;

#[tokio::test]
async fn replay_matches_the_live_stream() {
    let h = harness(2).await;
    let mut live = subscribe(&h, "build:log:");

    let id = submit(&h, job("replayable", &["printf 'one\\ntwo\\n'"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    let mut live_events = Vec::new();
    for _ in 0..3 {
        let (_, data) = next_frame(&mut live).await;
        live_events.push((
            data["id"].as_u64().unwrap(),
            data["data"].as_str().unwrap().to_string(),
        ));
    }

    // A client that subscribes after completion sees nothing live, but
    // replay re-emits the identical sequence from the log file.
    let mut late = subscribe(&h, format!("build:log:{id}").as_str());
    h.engine.replay(id, 0).await.unwrap();

    let mut replayed = Vec::new();
    for _ in 0..3 {
        let (topic, data) = next_frame(&mut late).await;
        assert_eq!(topic, format!("build:log:{id}"));
        replayed.push((
            data["id"].as_u64().unwrap(),
            data["data"].as_str().unwrap().to_string(),
        ));
    }

    assert_eq!(replayed, live_events);
}

#[tokio::test]
async fn replay_without_a_log_is_not_found() {
    let h = harness(2).await;
    assert!(matches!(
        h.engine.replay(9, 9).await,
        Err(EngineError::NotFound(9))
    ));
}
