// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing message shapes.
//!
//! Every frame on a connection is the envelope `{"type": .., "data": ..}`.
//! Inbound frames are [`Request`]s; outbound frames are [`Response`]s
//! interleaved with broadcast events, which use the same envelope with
//! the event topic as the type.

use serde::{Deserialize, Serialize};
use wake_core::{BuildUpdate, Job, ParamMap};

/// Messages a client sends to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Request {
    /// Add topic prefixes to this connection's subscription set.
    Subscribe { to: Vec<String> },
    /// Remove topic prefixes from this connection's subscription set.
    Unsubscribe { to: Vec<String> },
    /// Create a build for the named job definition.
    Submit {
        name: String,
        #[serde(default)]
        params: ParamMap,
    },
    /// Cooperatively cancel a build.
    Abort { id: u64 },
    /// Fetch a build's job and latest history record.
    Get { id: u64 },
    /// List recent builds, newest first.
    Feed {
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Re-emit a task's log file as log events on the bus.
    Replay { id: u64, task_id: u32 },
    Ping,
}

/// Messages the daemon sends back to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Response {
    Submitted { id: u64 },
    Ok,
    Pong,
    Build { job: Job, update: BuildUpdate },
    Feed { builds: Vec<BuildUpdate> },
    Error { message: String },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
