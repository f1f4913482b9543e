// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A build: one scheduled execution of a job.

use crate::event::{BuildUpdate, TaskUpdate};
use crate::job::{merge_params, Job, ParamMap};
use crate::status::BuildStatus;
use std::sync::Arc;

/// A single scheduled execution of a [`Job`].
///
/// Ids are allocated by the identity store and strictly increase across
/// the process's entire history. Once admitted, a build is mutated only
/// by its executor; the queue reaches it through a separate single-shot
/// abort channel.
#[derive(Debug, Clone)]
pub struct Build {
    pub id: u64,
    pub job: Arc<Job>,
    pub status: BuildStatus,
    /// Parameter maps after submission overrides, merged in order to
    /// form the task environment.
    pub params: Vec<ParamMap>,
    /// One status per task, in the job's declared task order.
    pub task_status: Vec<BuildStatus>,
    /// Basenames of artifacts actually collected (populated on success).
    pub artifacts: Vec<String>,
}

impl Build {
    /// Create a pending build for `job`.
    pub fn new(id: u64, job: Arc<Job>, params: Vec<ParamMap>) -> Self {
        let task_status = vec![BuildStatus::Pending; job.tasks.len()];
        Self {
            id,
            job,
            status: BuildStatus::Pending,
            params,
            task_status,
            artifacts: Vec::new(),
        }
    }

    /// Snapshot the current state as a broadcast/history record.
    pub fn update(&self) -> BuildUpdate {
        BuildUpdate {
            id: self.id,
            name: self.job.name.clone(),
            status: self.status,
            tasks: self
                .job
                .tasks
                .iter()
                .zip(&self.task_status)
                .map(|(task, status)| TaskUpdate {
                    id: task.id,
                    status: *status,
                })
                .collect(),
            params: self.params.clone(),
            artifacts: self.artifacts.clone(),
        }
    }

    /// The merged task environment for this build.
    pub fn env(&self) -> ParamMap {
        merge_params(&self.params)
    }

    /// Set the status of the task at position `index`.
    ///
    /// Out-of-range indices are ignored; task order is fixed at creation.
    pub fn set_task_status(&mut self, index: usize, status: BuildStatus) {
        if let Some(slot) = self.task_status.get_mut(index) {
            *slot = status;
        }
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
