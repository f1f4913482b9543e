// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build execution.
//!
//! One executor task runs per admitted build. It walks the job's tasks
//! in order, spawning each command under `sh -c` in the build's
//! workspace, streams captured stdout/stderr lines to the bus as they
//! arrive, reacts to the cooperative abort signal at every suspension
//! point, collects artifacts on success and releases the build back to
//! the queue at its terminal status.

use std::process::Stdio;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use wake_bus::Broadcaster;
use wake_core::{Build, BuildStatus, CommandLog, Event, Task};

use crate::queue::Queue;
use crate::workspace::Layout;

/// Capacity of the per-task line channel between the stream drainers
/// and the pump loop.
const LINE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
enum TaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

enum TaskOutcome {
    Finished,
    Failed(i32),
    Aborted,
}

/// Run `build` to a terminal status, then release it.
///
/// Never returns an error: every failure is captured here, reflected in
/// the build status, broadcast and persisted. The scheduler keeps
/// admitting builds regardless of this build's outcome.
pub(crate) async fn run(
    queue: Arc<Queue>,
    bus: Broadcaster,
    layout: Layout,
    mut build: Build,
    mut abort: oneshot::Receiver<()>,
) {
    build.status = BuildStatus::Running;
    bus.publish(Event::Update(build.update()));

    let job = Arc::clone(&build.job);
    let mut aborted = false;
    let mut failed = false;

    for (index, task) in job.tasks.iter().enumerate() {
        // An abort delivered between tasks must not start the next one.
        if matches!(abort.try_recv(), Ok(())) {
            aborted = true;
            break;
        }

        build.set_task_status(index, BuildStatus::Running);
        bus.publish(Event::Update(build.update()));

        match run_task(&bus, &layout, &build, task, &mut abort).await {
            Ok(TaskOutcome::Finished) => {
                build.set_task_status(index, BuildStatus::Finished);
                bus.publish(Event::Update(build.update()));
            }
            Ok(TaskOutcome::Failed(code)) => {
                warn!(build = build.id, task = task.id, code, "task failed");
                build.set_task_status(index, BuildStatus::Failed);
                failed = true;
                break;
            }
            Ok(TaskOutcome::Aborted) => {
                build.set_task_status(index, BuildStatus::Aborted);
                aborted = true;
                break;
            }
            Err(e) => {
                error!(build = build.id, task = task.id, error = %e, "task execution error");
                build.set_task_status(index, BuildStatus::Failed);
                failed = true;
                break;
            }
        }
    }

    build.status = if aborted {
        BuildStatus::Aborted
    } else if failed {
        BuildStatus::Failed
    } else {
        BuildStatus::Finished
    };

    if build.status == BuildStatus::Finished {
        collect_artifacts(&layout, &mut build).await;
    }

    bus.publish(Event::Update(build.update()));
    info!(build = build.id, status = %build.status, "build released");

    queue.remove(build.id);
    queue.tick();
}

/// Run one task to completion, streaming its output.
async fn run_task(
    bus: &Broadcaster,
    layout: &Layout,
    build: &Build,
    task: &Task,
    abort: &mut oneshot::Receiver<()>,
) -> Result<TaskOutcome, TaskError> {
    let log_path = layout.task_log_path(build.id, task.id);
    let mut log = tokio::fs::File::create(&log_path).await?;

    // The command string is the log file's first line and log event 0;
    // captured stream lines count from 1. Replay relies on this.
    log.write_all(task.command.as_bytes()).await?;
    log.write_all(b"\n").await?;
    publish_line(bus, build.id, task.id, 0, task.command.clone());

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&task.command)
        .current_dir(layout.workspace_dir(build.id))
        .envs(build.env())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);
    if let Some(stdout) = child.stdout.take() {
        spawn_drainer(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_drainer(stderr, line_tx.clone());
    }
    // Drainers hold the only senders; the pump ends when both close.
    drop(line_tx);

    let mut next_line = 1u64;
    let mut aborted = false;
    loop {
        tokio::select! {
            line = line_rx.recv() => match line {
                Some(line) => {
                    log.write_all(line.as_bytes()).await?;
                    log.write_all(b"\n").await?;
                    publish_line(bus, build.id, task.id, next_line, line);
                    next_line += 1;
                }
                None => break,
            },
            _ = &mut *abort => {
                aborted = true;
                break;
            }
        }
    }

    if aborted {
        info!(build = build.id, task = task.id, "abort requested, terminating task");
        if let Err(e) = child.start_kill() {
            warn!(build = build.id, task = task.id, error = %e, "failed to signal task");
        }
        let _ = child.wait().await;
        // Keep whatever the drainers captured before the kill.
        while let Ok(line) = line_rx.try_recv() {
            log.write_all(line.as_bytes()).await?;
            log.write_all(b"\n").await?;
            publish_line(bus, build.id, task.id, next_line, line);
            next_line += 1;
        }
        log.flush().await?;
        return Ok(TaskOutcome::Aborted);
    }

    // Both streams hit EOF and the channel drained, so no output is
    // left behind; now collect the exit status.
    let status = child.wait().await?;
    log.flush().await?;

    match status.code() {
        Some(0) => Ok(TaskOutcome::Finished),
        Some(code) => Ok(TaskOutcome::Failed(code)),
        // Killed by a signal outside our abort path.
        None => Ok(TaskOutcome::Failed(-1)),
    }
}

fn publish_line(bus: &Broadcaster, build_id: u64, task_id: u32, id: u64, data: String) {
    bus.publish(Event::Log {
        build_id,
        entry: CommandLog { task_id, id, data },
    });
}

fn spawn_drainer<R>(stream: R, tx: mpsc::Sender<String>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "output stream read failed");
                    break;
                }
            }
        }
    });
}

/// Copy files matching the job's artifact patterns into the wakespace.
///
/// Patterns resolve relative to the build workspace. Copy errors are
/// logged and skipped; they never demote a finished build.
async fn collect_artifacts(layout: &Layout, build: &mut Build) {
    if build.job.artifacts.is_empty() {
        return;
    }

    let artifacts_dir = layout.artifacts_dir(build.id);
    if let Err(e) = tokio::fs::create_dir_all(&artifacts_dir).await {
        warn!(build = build.id, error = %e, "cannot create artifacts dir");
        return;
    }

    let workspace = layout.workspace_dir(build.id);
    for pattern in &build.job.artifacts {
        let full = workspace.join(pattern);
        let Some(full) = full.to_str() else {
            warn!(build = build.id, pattern, "non-UTF-8 artifact pattern");
            continue;
        };
        let paths = match glob::glob(full) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(build = build.id, pattern, error = %e, "invalid artifact pattern");
                continue;
            }
        };
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(build = build.id, error = %e, "unreadable artifact match");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match tokio::fs::copy(&path, artifacts_dir.join(name)).await {
                Ok(_) => {
                    info!(build = build.id, artifact = name, "artifact collected");
                    build.artifacts.push(name.to_string());
                }
                Err(e) => {
                    warn!(build = build.id, artifact = name, error = %e, "artifact copy failed, skipping");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
