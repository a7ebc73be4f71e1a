// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution log streams.
//!
//! One append-only file per execution under a configurable root, with a
//! broadcast channel per execution for live subscribers. Writers are
//! line-buffered; completed-history reads return the whole file. A
//! periodic sweep prunes logs past the retention window. Writes that
//! complete before the executor returns are never lost; bytes written
//! after cancellation tripped may be.

use parking_lot::Mutex;
use relay_exec::{LineSink, StreamKind};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;

const SUBSCRIBER_CAPACITY: usize = 1024;

/// Log root shared by all executions.
pub struct LogSink {
    root: PathBuf,
    max_bytes: u64,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl LogSink {
    pub fn new(root: &Path, max_bytes: u64) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            max_bytes,
            channels: Mutex::new(HashMap::new()),
        })
    }

    fn log_path(&self, exec_id: &str) -> PathBuf {
        self.root.join(format!("{exec_id}.log"))
    }

    fn sender(&self, exec_id: &str) -> broadcast::Sender<String> {
        self.channels
            .lock()
            .entry(exec_id.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_CAPACITY).0)
            .clone()
    }

    /// Line sink feeding this execution's stream.
    pub fn writer(&self, exec_id: &str) -> std::io::Result<Arc<LogWriter>> {
        let path = self.log_path(exec_id);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Arc::new(LogWriter {
            file: Mutex::new(file),
            sender: self.sender(exec_id),
            max_bytes: self.max_bytes,
            written: AtomicU64::new(written),
        }))
    }

    /// Whole-file read for completed history.
    pub fn read(&self, exec_id: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.log_path(exec_id))
    }

    /// Live subscription; new lines are broadcast as they append.
    /// Subscribers observe channel close as EOF.
    pub fn subscribe(&self, exec_id: &str) -> broadcast::Receiver<String> {
        self.sender(exec_id).subscribe()
    }

    /// Drop the live channel for a finished execution; subscribers see
    /// EOF. The backing file stays until retention removes it.
    pub fn finish(&self, exec_id: &str) {
        self.channels.lock().remove(exec_id);
    }

    /// Prune logs older than the retention window. Returns how many
    /// files were removed.
    pub fn sweep(&self, retention: Duration) -> std::io::Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if modified < cutoff && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Line-buffered writer for one execution's stream.
pub struct LogWriter {
    file: Mutex<File>,
    sender: broadcast::Sender<String>,
    max_bytes: u64,
    written: AtomicU64,
}

impl LineSink for LogWriter {
    fn line(&self, stream: StreamKind, line: &str) {
        let bytes = line.len() as u64 + 1;
        let before = self.written.fetch_add(bytes, Ordering::SeqCst);
        if before + bytes > self.max_bytes {
            // Size cap reached; drop silently rather than fail the action.
            return;
        }
        {
            let mut file = self.file.lock();
            if writeln!(file, "{line}").is_err() {
                tracing::warn!(%stream, "log append failed");
            }
        }
        let _ = self.sender.send(line.to_string());
    }
}

/// Periodic retention sweep task.
pub(crate) async fn retention_loop(
    logs: Arc<LogSink>,
    retention: Duration,
    interval: Duration,
    shutdown: tokio_util::sync::CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        match logs.sweep(retention) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "pruned execution logs"),
            Err(e) => tracing::warn!(error = %e, "log retention sweep failed"),
        }
    }
}

#[cfg(test)]
#[path = "logsink_tests.rs"]
mod tests;
