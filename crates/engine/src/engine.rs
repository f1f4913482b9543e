// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operation surface external callers drive.
//!
//! `Engine` wires the identity store, the broadcast bus, the queue and
//! the filesystem layout behind the five operations of the public
//! contract: submit, abort, get, feed and replay. HTTP routing, job
//! file parsing and authentication live outside this crate.

use std::io;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use wake_bus::Broadcaster;
use wake_core::{apply_overrides, Build, BuildStatus, BuildUpdate, CommandLog, Event, Job, ParamMap};
use wake_storage::{Store, StoreError};

use crate::queue::{AbortOutcome, Queue};
use crate::workspace::Layout;

/// Feed page size when the caller passes no limit.
pub const DEFAULT_FEED_LIMIT: usize = 10;

/// Errors surfaced to a submitting caller. The build is never admitted
/// when submission fails.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the read-side operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("build {0} not found")]
    NotFound(u64),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Composition of the store, bus, queue and layout.
pub struct Engine {
    store: Arc<Store>,
    bus: Broadcaster,
    queue: Arc<Queue>,
    layout: Layout,
}

impl Engine {
    pub fn new(store: Arc<Store>, bus: Broadcaster, queue: Arc<Queue>, layout: Layout) -> Self {
        Self {
            store,
            bus,
            queue,
            layout,
        }
    }

    /// Create and enqueue a build for `job`.
    ///
    /// Allocates the id, materializes the build's workspace and
    /// wakespace, saves the job specification (`source_path` copied
    /// verbatim plus the canonical JSON record), applies the parameter
    /// overrides, publishes the initial pending update and ticks the
    /// queue.
    pub async fn submit(
        &self,
        job: Job,
        source_path: &Path,
        overrides: &ParamMap,
    ) -> Result<u64, SubmitError> {
        let id = self.store.allocate_id()?;

        self.layout.create_build_dirs(id).await?;
        tokio::fs::copy(source_path, self.layout.build_config_path(id)).await?;
        tokio::fs::write(
            self.layout.job_record_path(id),
            serde_json::to_vec_pretty(&job)?,
        )
        .await?;

        let mut params = job.params.clone();
        apply_overrides(&mut params, overrides);

        let build = Build::new(id, Arc::new(job), params);
        info!(build = id, job = %build.job.name, "build submitted");

        self.bus.publish(Event::Update(build.update()));
        self.queue.add(build);
        self.queue.tick();
        Ok(id)
    }

    /// Abort a build by id. See [`Queue::abort`] for the semantics.
    pub fn abort(&self, id: u64) -> AbortOutcome {
        self.queue.abort(id)
    }

    /// The job a build was created from plus its latest history record.
    pub async fn get(&self, id: u64) -> Result<(Job, BuildUpdate), EngineError> {
        let update = self.store.get_history(id).ok_or(EngineError::NotFound(id))?;
        let raw = tokio::fs::read(self.layout.job_record_path(id))
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    EngineError::NotFound(id)
                } else {
                    EngineError::Io(e)
                }
            })?;
        let job = serde_json::from_slice(&raw)?;
        Ok((job, update))
    }

    /// Recent history in descending id order.
    ///
    /// Performs the lazy liveness repair: a record still pending or
    /// running whose id the queue no longer tracks belonged to a dead
    /// process lifetime, so it is rewritten to aborted (published
    /// through the bus, which persists it).
    pub fn feed(&self, limit: usize) -> Vec<BuildUpdate> {
        let mut records = self.store.iter_history_desc(limit);
        for record in &mut records {
            if !record.status.is_terminal() && !self.queue.contains(record.id) {
                warn!(
                    build = record.id,
                    status = %record.status,
                    "stale record from a previous run, marking aborted"
                );
                record.status = BuildStatus::Aborted;
                self.bus.publish(Event::Update(record.clone()));
            }
        }
        records
    }

    /// Re-emit a task's log file as `build:log:<id>` events, using the
    /// line index as the event id.
    pub async fn replay(&self, build_id: u64, task_id: u32) -> Result<(), EngineError> {
        let path = self.layout.task_log_path(build_id, task_id);
        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::NotFound(build_id)
            } else {
                EngineError::Io(e)
            }
        })?;

        let mut lines = BufReader::new(file).lines();
        let mut index = 0u64;
        while let Some(line) = lines.next_line().await? {
            self.bus.publish(Event::Log {
                build_id,
                entry: CommandLog {
                    task_id,
                    id: index,
                    data: line,
                },
            });
            index += 1;
        }
        Ok(())
    }

    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
