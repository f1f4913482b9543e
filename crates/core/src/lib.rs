// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wake-core: data and event model for the wake CI daemon.

pub mod build;
pub mod event;
pub mod job;
pub mod status;

pub use build::Build;
pub use event::{log_topic, update_topic, BuildUpdate, CommandLog, Event, TaskUpdate};
pub use job::{apply_overrides, merge_params, Job, ParamMap, Task};
pub use status::BuildStatus;
