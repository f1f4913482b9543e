// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-build filesystem layout.
//!
//! Two trees live under the working directory. `workspace/<id>/` is the
//! working directory every task runs in, meant for user-created files.
//! `wakespace/<id>/` is internal per-build scratch: the saved job
//! specification, `task_<id>.log` files, and the collected artifacts.
//! Each build owns its two directories exclusively.

use std::io;
use std::path::{Path, PathBuf};

/// Path arithmetic and directory creation for build isolation.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Task working directory for one build.
    pub fn workspace_dir(&self, id: u64) -> PathBuf {
        self.root.join("workspace").join(id.to_string())
    }

    /// Internal scratch directory for one build.
    pub fn wakespace_dir(&self, id: u64) -> PathBuf {
        self.root.join("wakespace").join(id.to_string())
    }

    /// Verbatim copy of the submitted job specification.
    pub fn build_config_path(&self, id: u64) -> PathBuf {
        self.wakespace_dir(id).join("build.yaml")
    }

    /// Canonical JSON record of the parsed job, written at submission.
    pub fn job_record_path(&self, id: u64) -> PathBuf {
        self.wakespace_dir(id).join("job.json")
    }

    /// Log file for one task of one build.
    pub fn task_log_path(&self, id: u64, task_id: u32) -> PathBuf {
        self.wakespace_dir(id).join(format!("task_{task_id}.log"))
    }

    /// Where collected artifacts are copied on success.
    pub fn artifacts_dir(&self, id: u64) -> PathBuf {
        self.wakespace_dir(id).join("artifacts")
    }

    /// Create the two top-level trees.
    pub async fn init(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.root.join("workspace")).await?;
        tokio::fs::create_dir_all(self.root.join("wakespace")).await?;
        Ok(())
    }

    /// Create the per-build directories.
    pub async fn create_build_dirs(&self, id: u64) -> io::Result<()> {
        tokio::fs::create_dir_all(self.workspace_dir(id)).await?;
        tokio::fs::create_dir_all(self.wakespace_dir(id)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
