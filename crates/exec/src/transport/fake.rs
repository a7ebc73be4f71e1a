// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for tests.
//!
//! Pretends a directory on the local filesystem is the remote host:
//! `run` executes through a local shell, transfers are filesystem
//! copies. Lets the remote execution path (wrap, upload, run, download,
//! cleanup) be exercised without an sshd.

use super::{Transport, TransportError, TunnelStream};
use crate::sink::LineSink;
use crate::subprocess::run_streaming;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations performed, in order ("run", "upload", "download", "close").
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
        env: &HashMap<String, String>,
        sink: Arc<dyn LineSink>,
    ) -> Result<i32, TransportError> {
        self.record(format!("run: {command}"));
        let mut cmd = tokio::process::Command::new("/bin/bash");
        cmd.arg("-c").arg(command).envs(env);
        run_streaming(cmd, cancel, sink, "fake transport run")
            .await
            .map_err(|e| TransportError::Connection {
                target: "fake".to_string(),
                message: e.to_string(),
            })
    }

    async fn upload(
        &self,
        _cancel: &CancellationToken,
        local: &Path,
        remote: &str,
    ) -> Result<(), TransportError> {
        self.record(format!("upload: {remote}"));
        if let Some(parent) = Path::new(remote).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, remote).await?;
        Ok(())
    }

    async fn download(
        &self,
        _cancel: &CancellationToken,
        remote: &str,
        local: &Path,
    ) -> Result<(), TransportError> {
        self.record(format!("download: {remote}"));
        if !Path::new(remote).exists() {
            return Err(TransportError::Transfer {
                direction: "download",
                path: remote.to_string(),
                message: "no such file".to_string(),
            });
        }
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(remote, local).await?;
        Ok(())
    }

    async fn dial(
        &self,
        _cancel: &CancellationToken,
        network: &str,
        _address: &str,
    ) -> Result<Box<dyn TunnelStream>, TransportError> {
        Err(TransportError::Connection {
            target: "fake".to_string(),
            message: format!("dial not supported in fake transport ({network})"),
        })
    }

    async fn close(&self) {
        self.record("close");
        self.closed.store(true, Ordering::SeqCst);
    }
}
