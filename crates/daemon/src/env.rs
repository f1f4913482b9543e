// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Resolve working directory: WAKE_DIR > XDG_STATE_HOME/wake > ~/.local/state/wake
pub fn work_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("WAKE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("wake"));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local/state/wake"))
}

/// Listening port override
pub fn port() -> Option<u16> {
    std::env::var("WAKE_PORT").ok().and_then(|s| s.parse().ok())
}

/// Advertised hostname override
pub fn hostname() -> Option<String> {
    std::env::var("WAKE_HOST").ok()
}

/// Concurrency override
pub fn builds() -> Option<usize> {
    std::env::var("WAKE_BUILDS")
        .ok()
        .and_then(|s| s.parse().ok())
}

/// Operator password to hash into the global bucket at startup
pub fn admin_password() -> Option<String> {
    std::env::var("WAKE_ADMIN_PASSWORD").ok()
}
