//! Log events number strictly from zero and mirror the log file.

use crate::prelude::*;
use similar_asserts::assert_eq;
use wake_core::BuildStatus;

#[tokio::test]
async fn ids_are_strict_and_data_matches_the_file() {
    let h = harness(2).await;
    let mut logs = subscribe(&h, "build:log:");

    let id = submit(&h, job("printer", &["printf 'alpha\\nbeta\\ngamma\\n'"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    let mut events = Vec::new();
    for _ in 0..4 {
        let (topic, data) = next_frame(&mut logs).await;
        assert_eq!(topic, format!("build:log:{id}"));
        assert_eq!(data["task_id"], 0);
        events.push((
            data["id"].as_u64().unwrap(),
            data["data"].as_str().unwrap().to_string(),
        ));
    }

    // Ids are 0, 1, 2, ... strictly.
    let ids: Vec<u64> = events.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    // The concatenation of the data after the command line equals the
    // log file contents after its first line.
    let log_file =
        std::fs::read_to_string(h.engine.layout().task_log_path(id, 0)).unwrap();
    let (first_line, rest) = log_file.split_once('\n').unwrap();
    assert_eq!(events[0].1, first_line);

    let streamed: String = events[1..]
        .iter()
        .map(|(_, data)| format!("{data}\n"))
        .collect();
    assert_eq!(streamed, rest);
}

#[tokio::test]
async fn each_task_restarts_the_counter() {
    let h = harness(2).await;
    let mut logs = subscribe(&h, "build:log:");

    let id = submit(&h, job("two-tasks", &["echo one", "echo two"])).await;
    wait_for_status(&h, id, BuildStatus::Finished).await;

    let mut per_task: std::collections::BTreeMap<u64, Vec<u64>> = Default::default();
    for _ in 0..4 {
        let (_, data) = next_frame(&mut logs).await;
        per_task
            .entry(data["task_id"].as_u64().unwrap())
            .or_default()
            .push(data["id"].as_u64().unwrap());
    }

    assert_eq!(per_task[&0], vec![0, 1]);
    assert_eq!(per_task[&1], vec![0, 1]);
}
