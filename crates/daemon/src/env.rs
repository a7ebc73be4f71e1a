// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: RELAY_STATE_DIR > XDG_STATE_HOME/relay >
/// ~/.local/state/relay
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("RELAY_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("relay"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/relay"))
}

/// Directory scanned for flow source files (default `<state>/flows`).
pub fn flow_dir(state: &std::path::Path) -> PathBuf {
    std::env::var("RELAY_FLOW_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| state.join("flows"))
}

/// Optional JSON file listing target nodes.
pub fn nodes_file(state: &std::path::Path) -> PathBuf {
    std::env::var("RELAY_NODES_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| state.join("nodes.json"))
}

/// Namespace this daemon serves (default empty = single-tenant).
pub fn namespace() -> String {
    std::env::var("RELAY_NAMESPACE").unwrap_or_default()
}

/// Worker pool size (default = CPU count).
pub fn workers() -> Option<usize> {
    std::env::var("RELAY_WORKERS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

fn duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Queue sweep interval (default 10 s).
pub fn sweep_interval() -> Duration {
    duration_ms("RELAY_SWEEP_INTERVAL_MS", Duration::from_secs(10))
}

/// Cron resync interval (default 5 min).
pub fn resync_interval() -> Duration {
    duration_ms("RELAY_RESYNC_INTERVAL_MS", Duration::from_secs(300))
}

/// Shutdown drain timeout (default 5 s).
pub fn drain_timeout() -> Duration {
    duration_ms("RELAY_DRAIN_TIMEOUT_MS", Duration::from_secs(5))
}

/// Log retention window (default 14 days).
pub fn log_retention() -> Duration {
    std::env::var("RELAY_LOG_RETENTION_HOURS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|hours| Duration::from_secs(hours * 3600))
        .unwrap_or(Duration::from_secs(14 * 24 * 3600))
}

/// Per-execution log size cap in bytes (default 16 MiB).
pub fn log_max_bytes() -> u64 {
    std::env::var("RELAY_LOG_MAX_BYTES")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(16 * 1024 * 1024)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
