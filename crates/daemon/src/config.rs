// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Precedence: defaults < `<work_dir>/wake.toml` < `WAKE_*` environment
//! variables. There is no dynamic reconfiguration; the daemon reads its
//! configuration once at startup.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::env;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot resolve a working directory (set WAKE_DIR or HOME)")]
    NoWorkDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid wake.toml: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Optional `wake.toml` fields.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    hostname: Option<String>,
    builds: Option<usize>,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the filesystem state: database, logs, workspaces, jobs.
    pub work_dir: PathBuf,
    pub port: u16,
    /// Advertised origin for browser-facing deployments; informational
    /// here, consumed by whatever fronts the daemon.
    pub hostname: String,
    /// Maximum number of concurrently executing builds.
    pub builds: usize,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let work_dir = env::work_dir().ok_or(ConfigError::NoWorkDir)?;
        Self::load_from(work_dir)
    }

    /// Load with an explicit working directory; the config file and
    /// environment overrides still apply.
    pub fn load_from(work_dir: PathBuf) -> Result<Self, ConfigError> {
        let path = work_dir.join("wake.toml");
        let file = if path.exists() {
            toml::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            FileConfig::default()
        };

        Ok(Self {
            work_dir,
            port: env::port().or(file.port).unwrap_or(DEFAULT_PORT),
            hostname: env::hostname().or(file.hostname).unwrap_or_default(),
            builds: env::builds()
                .or(file.builds)
                .unwrap_or(wake_engine::DEFAULT_CONCURRENCY)
                .max(1),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.work_dir.join("wake.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join("daemon.log")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.work_dir.join("waked.lock")
    }

    /// Directory of job definitions, one `<name>.json` per job.
    pub fn jobs_dir(&self) -> PathBuf {
        self.work_dir.join("jobs")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
