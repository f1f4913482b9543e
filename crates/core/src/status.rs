// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build and task status values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a build, or of one task within it.
///
/// `Finished`, `Failed` and `Aborted` are terminal: once a build reaches
/// one of them, no further transition is emitted or persisted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    /// Created or queued, not yet admitted by the scheduler.
    Pending,
    /// Admitted; an executor owns it.
    Running,
    /// All tasks exited 0.
    Finished,
    /// A task exited nonzero (or could not be run at all).
    Failed,
    /// Cooperatively cancelled.
    Aborted,
}

impl BuildStatus {
    /// True for `Finished`, `Failed` and `Aborted`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::Finished | BuildStatus::Failed | BuildStatus::Aborted
        )
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Pending => write!(f, "pending"),
            BuildStatus::Running => write!(f, "running"),
            BuildStatus::Finished => write!(f, "finished"),
            BuildStatus::Failed => write!(f, "failed"),
            BuildStatus::Aborted => write!(f, "aborted"),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
