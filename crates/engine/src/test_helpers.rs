// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use wake_bus::{Broadcaster, Client, ClientList};
use wake_core::{BuildStatus, BuildUpdate, Job, ParamMap, Task};
use wake_storage::Store;

use crate::engine::Engine;
use crate::queue::Queue;
use crate::workspace::Layout;

pub(crate) struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<Store>,
    pub clients: Arc<ClientList>,
    pub bus: Broadcaster,
    pub queue: Arc<Queue>,
    pub engine: Engine,
}

/// Full in-process stack over a tempdir, dispatcher running.
pub(crate) async fn harness(capacity: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(Store::open(&dir.path().join("wake.db")).unwrap());
    let clients = Arc::new(ClientList::new());
    let (bus, dispatcher) = Broadcaster::new(Arc::clone(&store), Arc::clone(&clients));
    tokio::spawn(dispatcher.run());

    let layout = Layout::new(dir.path());
    layout.init().await.unwrap();

    let queue = Queue::new(capacity, bus.clone(), layout.clone());
    let engine = Engine::new(
        Arc::clone(&store),
        bus.clone(),
        Arc::clone(&queue),
        layout,
    );

    Harness {
        dir,
        store,
        clients,
        bus,
        queue,
        engine,
    }
}

/// A job whose task ids are the command positions.
pub(crate) fn job(name: &str, commands: &[&str]) -> Job {
    Job {
        name: name.to_string(),
        tasks: commands
            .iter()
            .enumerate()
            .map(|(index, command)| Task {
                id: index as u32,
                command: command.to_string(),
            })
            .collect(),
        artifacts: vec![],
        params: vec![],
    }
}

pub(crate) async fn submit(harness: &Harness, job: Job) -> u64 {
    submit_with(harness, job, &ParamMap::new()).await
}

/// Write the job spec to a source file and submit it.
pub(crate) async fn submit_with(harness: &Harness, job: Job, overrides: &ParamMap) -> u64 {
    let source = harness.dir.path().join(format!("{}.json", job.name));
    tokio::fs::write(&source, serde_json::to_vec(&job).unwrap())
        .await
        .unwrap();
    harness.engine.submit(job, &source, overrides).await.unwrap()
}

/// Poll history until the build reaches `status` (or settles elsewhere).
pub(crate) async fn wait_for_status(
    harness: &Harness,
    id: u64,
    status: BuildStatus,
) -> BuildUpdate {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(update) = harness.store.get_history(id) {
            if update.status == status {
                return update;
            }
            assert!(
                !update.status.is_terminal(),
                "build {id} settled at {} while waiting for {status}",
                update.status
            );
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for build {id} to reach {status}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Attach a subscriber for `prefix` and return its frame receiver.
pub(crate) fn subscribe(harness: &Harness, prefix: &str) -> mpsc::Receiver<Arc<[u8]>> {
    let (client, rx) = Client::new();
    client.subscribe(prefix);
    harness.clients.attach(client);
    rx
}

/// Decode the next frame as (topic, data).
pub(crate) async fn next_frame(
    rx: &mut mpsc::Receiver<Arc<[u8]>>,
) -> (String, serde_json::Value) {
    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("bus closed");
    let value: serde_json::Value = serde_json::from_slice(&frame).unwrap();
    let topic = value["type"].as_str().unwrap().to_string();
    (topic, value["data"].clone())
}
