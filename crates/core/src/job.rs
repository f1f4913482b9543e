// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions: the immutable input a build is created from.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered string-to-string mapping.
///
/// Parameters keep their declaration order so that records round-trip
/// byte-for-byte and later maps can be merged over earlier ones.
pub type ParamMap = IndexMap<String, String>;

/// One shell command within a job, executed as its own subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable numeric id, unique within the job.
    pub id: u32,
    /// Passed verbatim to `sh -c`.
    pub command: String,
}

/// A static, user-authored description of work.
///
/// A job is never mutated after submission; builds hold a shared
/// reference to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub tasks: Vec<Task>,
    /// Glob patterns resolved against the build workspace on success.
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Default parameter maps, merged in order.
    #[serde(default)]
    pub params: Vec<ParamMap>,
}

impl Job {
    /// Look up a task by its stable id.
    pub fn task(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Merge parameter maps in declaration order.
///
/// Later maps win for keys they share with earlier ones.
pub fn merge_params(params: &[ParamMap]) -> ParamMap {
    let mut merged = ParamMap::new();
    for map in params {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Apply submission-time overrides to a build's parameter maps.
///
/// Each override key replaces its current value in every map that
/// defines it; keys defined in no map are ignored.
pub fn apply_overrides(params: &mut [ParamMap], overrides: &ParamMap) {
    for map in params {
        for (key, value) in overrides {
            if map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
