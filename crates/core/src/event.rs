// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle and log message shapes routed over the broadcast bus.
//!
//! Topics are flat strings matched by prefix, never a hierarchical
//! tree: `build:update:<id>` for lifecycle snapshots, `build:log:<id>`
//! for captured output lines. Subscribing to `build:` receives both.

use crate::job::ParamMap;
use crate::status::BuildStatus;
use serde::{Deserialize, Serialize};

/// Prefix shared by every build event topic.
pub const BUILD_TOPIC: &str = "build:";

/// Topic carrying lifecycle updates for one build.
pub fn update_topic(id: u64) -> String {
    format!("build:update:{id}")
}

/// Topic carrying log lines for one build.
pub fn log_topic(id: u64) -> String {
    format!("build:log:{id}")
}

/// Per-task slice of a [`BuildUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub id: u32,
    pub status: BuildStatus,
}

/// Full snapshot of a build.
///
/// Broadcast on every status change and persisted as the build's
/// authoritative history record; the on-wire and on-disk shapes are
/// identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUpdate {
    pub id: u64,
    pub name: String,
    pub status: BuildStatus,
    pub tasks: Vec<TaskUpdate>,
    pub params: Vec<ParamMap>,
    pub artifacts: Vec<String>,
}

/// One captured output line of a task.
///
/// `id` 0 carries the task's command string; stream lines count from 1.
/// The same numbering is used when replaying a task log file, where the
/// command string is the first line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    pub task_id: u32,
    pub id: u64,
    pub data: String,
}

/// An event routed by the broadcast bus.
#[derive(Debug, Clone)]
pub enum Event {
    /// Build lifecycle change; also written through the identity store.
    Update(BuildUpdate),
    /// Captured output line; broadcast only, the log file is the
    /// persistent artifact.
    Log { build_id: u64, entry: CommandLog },
}

/// Envelope wrapping every frame sent to a subscriber.
#[derive(Serialize)]
struct Envelope<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a T,
}

impl Event {
    /// The build this event belongs to.
    pub fn build_id(&self) -> u64 {
        match self {
            Event::Update(update) => update.id,
            Event::Log { build_id, .. } => *build_id,
        }
    }

    /// The topic this event is published under.
    pub fn topic(&self) -> String {
        match self {
            Event::Update(update) => update_topic(update.id),
            Event::Log { build_id, .. } => log_topic(*build_id),
        }
    }

    /// True for lifecycle updates, which must never be dropped.
    pub fn is_update(&self) -> bool {
        matches!(self, Event::Update(_))
    }

    /// Serialize the bus envelope `{"type": <topic>, "data": <record>}`.
    pub fn to_frame(&self) -> Result<Vec<u8>, serde_json::Error> {
        let kind = self.topic();
        match self {
            Event::Update(update) => serde_json::to_vec(&Envelope {
                kind: &kind,
                data: update,
            }),
            Event::Log { entry, .. } => serde_json::to_vec(&Envelope {
                kind: &kind,
                data: entry,
            }),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
