// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-concurrency build scheduler.
//!
//! Process-wide singleton holding two ordered lists behind one mutex:
//! `active` (executing builds, at most the configured concurrency) and
//! `waiting` (FIFO). `tick` promotes waiters whenever capacity allows
//! and is safe to call on every admission and every release. A build in
//! `running` status is always present in the active set.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info};
use wake_bus::Broadcaster;
use wake_core::{Build, BuildStatus, Event};

use crate::executor;
use crate::workspace::Layout;

/// Default maximum number of concurrently executing builds.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Outcome of an abort request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortOutcome {
    /// The build was executing; its abort signal has been fired.
    Signalled,
    /// The build was still waiting; it was removed and marked aborted.
    Dequeued,
    /// The queue does not track this id.
    NotFound,
}

/// An executing build: its id plus the single-shot abort sender.
struct ActiveBuild {
    id: u64,
    abort: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct QueueState {
    active: Vec<ActiveBuild>,
    waiting: Vec<Build>,
}

/// The build queue and scheduler.
pub struct Queue {
    capacity: usize,
    bus: Broadcaster,
    layout: Layout,
    state: Mutex<QueueState>,
}

impl Queue {
    pub fn new(capacity: usize, bus: Broadcaster, layout: Layout) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            bus,
            layout,
            state: Mutex::new(QueueState::default()),
        })
    }

    /// Append a build to the waiting list. Callers follow up with
    /// [`Queue::tick`].
    pub fn add(&self, build: Build) {
        let mut state = self.state.lock();
        debug!(build = build.id, waiting = state.waiting.len() + 1, "build queued");
        state.waiting.push(build);
    }

    /// Promote waiting builds while capacity allows, spawning one
    /// executor task per admission. Idempotent.
    pub fn tick(self: &Arc<Self>) {
        while let Some((build, abort_rx)) = self.admit_one() {
            info!(
                build = build.id,
                job = %build.job.name,
                running = self.running_count(),
                "admitting build"
            );
            tokio::spawn(executor::run(
                Arc::clone(self),
                self.bus.clone(),
                self.layout.clone(),
                build,
                abort_rx,
            ));
        }
    }

    fn admit_one(&self) -> Option<(Build, oneshot::Receiver<()>)> {
        let mut state = self.state.lock();
        if state.active.len() >= self.capacity || state.waiting.is_empty() {
            return None;
        }
        let build = state.waiting.remove(0);
        let (abort_tx, abort_rx) = oneshot::channel();
        state.active.push(ActiveBuild {
            id: build.id,
            abort: Some(abort_tx),
        });
        Some((build, abort_rx))
    }

    /// Remove a build from the active set. No-op when absent. Called by
    /// the executor at release.
    pub fn remove(&self, id: u64) {
        let mut state = self.state.lock();
        if let Some(index) = state.active.iter().position(|a| a.id == id) {
            state.active.remove(index);
        }
    }

    /// Abort a tracked build.
    ///
    /// An executing build gets its single-shot signal fired (at most
    /// once); a waiting build is removed and marked aborted directly,
    /// with the terminal update published.
    pub fn abort(&self, id: u64) -> AbortOutcome {
        let mut state = self.state.lock();

        if let Some(active) = state.active.iter_mut().find(|a| a.id == id) {
            if let Some(sender) = active.abort.take() {
                // The executor may have just finished; a lost signal is
                // equivalent to the build winning the race.
                let _ = sender.send(());
                info!(build = id, "abort signalled");
            }
            return AbortOutcome::Signalled;
        }

        if let Some(index) = state.waiting.iter().position(|b| b.id == id) {
            let mut build = state.waiting.remove(index);
            drop(state);
            build.status = BuildStatus::Aborted;
            info!(build = id, "aborted while waiting");
            self.bus.publish(Event::Update(build.update()));
            return AbortOutcome::Dequeued;
        }

        AbortOutcome::NotFound
    }

    /// Whether the queue currently tracks this id, active or waiting.
    /// External readers use this to spot stale history records.
    pub fn contains(&self, id: u64) -> bool {
        let state = self.state.lock();
        state.active.iter().any(|a| a.id == id) || state.waiting.iter().any(|b| b.id == id)
    }

    /// Number of currently executing builds.
    pub fn running_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Number of builds waiting for admission.
    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
