// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wake Daemon (waked)
//!
//! Self-hosted continuous-integration daemon: accepts job submissions,
//! schedules builds under a bounded concurrency policy, executes their
//! tasks against isolated per-build workspaces and streams lifecycle
//! and log events to connected clients.
//!
//! Architecture:
//! - Listener task: accepts client connections, one task per connection
//! - Dispatcher task: persists lifecycle updates and fans events out
//! - Executor tasks: one per admitted build, spawned by the queue

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod listener;
mod protocol;
mod wire;

use std::sync::Arc;

use fs2::FileExt;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use wake_bus::{Broadcaster, ClientList};
use wake_engine::{Engine, Layout, Queue};
use wake_storage::Store;

use crate::config::Config;
use crate::listener::{ListenCtx, Listener};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("waked {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("waked {}", env!("CARGO_PKG_VERSION"));
                println!("Wake Daemon - self-hosted continuous-integration server");
                println!();
                println!("USAGE:");
                println!("    waked");
                println!();
                println!("Configuration comes from <work_dir>/wake.toml and WAKE_*");
                println!("environment variables (WAKE_DIR, WAKE_PORT, WAKE_HOST,");
                println!("WAKE_BUILDS, WAKE_ADMIN_PASSWORD).");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: waked [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    std::fs::create_dir_all(&config.work_dir)?;

    rotate_log_if_needed(&config.log_path());
    let _log_guard = setup_logging(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting waked");

    // Exclusive working-directory lock. Two daemons sharing a database
    // file would corrupt the id counter. Avoid truncating before the
    // lock is held so a running daemon's PID is not wiped.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(config.lock_path())?;
    if lock_file.try_lock_exclusive().is_err() {
        let pid = std::fs::read_to_string(config.lock_path())
            .unwrap_or_default()
            .trim()
            .to_string();
        eprintln!(
            "waked is already running for {}",
            config.work_dir.display()
        );
        if !pid.is_empty() {
            eprintln!("  pid: {pid}");
        }
        std::process::exit(1);
    }
    {
        use std::io::Write;
        let mut lock_writer = &lock_file;
        lock_file.set_len(0)?;
        writeln!(lock_writer, "{}", std::process::id())?;
    }

    let store = Arc::new(Store::open(&config.db_path())?);
    if let Some(password) = env::admin_password() {
        store.put_global("password", &hash_password(&password))?;
        info!("operator password record updated");
    }

    let layout = Layout::new(&config.work_dir);
    layout.init().await?;
    tokio::fs::create_dir_all(config.jobs_dir()).await?;

    let clients = Arc::new(ClientList::new());
    let (bus, dispatcher) = Broadcaster::new(Arc::clone(&store), Arc::clone(&clients));
    tokio::spawn(dispatcher.run());

    let queue = Queue::new(config.builds, bus.clone(), layout.clone());
    let engine = Engine::new(Arc::clone(&store), bus, Arc::clone(&queue), layout);

    let socket = TcpListener::bind(("127.0.0.1", config.port)).await?;
    let ctx = Arc::new(ListenCtx {
        engine,
        clients,
        jobs_dir: config.jobs_dir(),
    });
    tokio::spawn(Listener::new(socket, ctx).run());

    info!(
        port = config.port,
        hostname = %config.hostname,
        builds = config.builds,
        "daemon ready"
    );

    // Signal ready for whatever supervises the daemon.
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, exiting"),
        _ = sigint.recv() => info!("received SIGINT, exiting"),
    }

    // Exit is abrupt: committed history plus the feed's lazy liveness
    // repair cover any builds still in flight.
    Ok(())
}

/// Hex-encoded SHA-256 of the operator password. Stored in the global
/// bucket; verification happens in whatever fronts the daemon.
fn hash_password(password: &str) -> String {
    use sha2::{Digest, Sha256};
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are silently
/// ignored so the daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(&config.work_dir, "daemon.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
