// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess helpers.
//!
//! Children run in their own process group so cancellation can take the
//! whole tree down: SIGTERM first, SIGKILL after a grace period. Stdout
//! and stderr are streamed line-by-line into a [`LineSink`].

use crate::sink::{LineSink, StreamKind};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Grace period between SIGTERM and SIGKILL on cancellation.
const KILL_GRACE: Duration = Duration::from_secs(5);

/// Timeout for short housekeeping commands (transfers, cleanup).
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn {what}: {source}")]
    Spawn {
        what: String,
        source: std::io::Error,
    },
    #[error("{what} io error: {source}")]
    Io {
        what: String,
        source: std::io::Error,
    },
    #[error("{what} timed out after {seconds}s")]
    Timeout { what: String, seconds: u64 },
    #[error("{what} cancelled")]
    Cancelled { what: String },
}

/// Run a command to completion, streaming output lines into `sink`.
///
/// Returns the exit code (-1 when terminated by signal). Cancellation
/// tears down the process group and reports [`SubprocessError::Cancelled`];
/// lines already emitted stay in the sink.
pub async fn run_streaming(
    mut cmd: Command,
    cancel: &CancellationToken,
    sink: Arc<dyn LineSink>,
    what: &str,
) -> Result<i32, SubprocessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| SubprocessError::Spawn {
        what: what.to_string(),
        source,
    })?;
    let pid = child.id();

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_task = stdout.map(|s| spawn_reader(s, StreamKind::Stdout, Arc::clone(&sink)));
    let err_task = stderr.map(|s| spawn_reader(s, StreamKind::Stderr, Arc::clone(&sink)));

    let status = tokio::select! {
        status = child.wait() => status.map_err(|source| SubprocessError::Io {
            what: what.to_string(),
            source,
        })?,
        _ = cancel.cancelled() => {
            signal_group(pid, Signal::SIGTERM, what);
            if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
                signal_group(pid, Signal::SIGKILL, what);
                let _ = child.wait().await;
            }
            drain(out_task, err_task).await;
            return Err(SubprocessError::Cancelled {
                what: what.to_string(),
            });
        }
    };

    drain(out_task, err_task).await;
    Ok(status.code().unwrap_or(-1))
}

/// Run a command to completion with a timeout, capturing output.
///
/// For short housekeeping commands where streaming is not needed
/// (transfers, remote cleanup).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    what: &str,
) -> Result<std::process::Output, SubprocessError> {
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    let fut = cmd.output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|source| SubprocessError::Io {
            what: what.to_string(),
            source,
        }),
        Err(_) => Err(SubprocessError::Timeout {
            what: what.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

fn spawn_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    sink: Arc<dyn LineSink>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            sink.line(kind, &line);
        }
    })
}

async fn drain(
    out: Option<tokio::task::JoinHandle<()>>,
    err: Option<tokio::task::JoinHandle<()>>,
) {
    if let Some(task) = out {
        let _ = task.await;
    }
    if let Some(task) = err {
        let _ = task.await;
    }
}

fn signal_group(pid: Option<u32>, signal: Signal, what: &str) {
    let Some(pid) = pid else { return };
    tracing::debug!(pid, %signal, what, "signalling process group");
    let _ = killpg(Pid::from_raw(pid as i32), signal);
}

/// Quote a string for safe interpolation into a shell command.
///
/// Wraps in single quotes with the `'\''` idiom for embedded quotes.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
