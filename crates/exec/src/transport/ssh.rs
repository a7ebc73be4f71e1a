// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH transport.
//!
//! Drives the `ssh`/`scp` CLIs in BatchMode rather than an in-process
//! client: host key and agent handling stay with the operator's OpenSSH
//! configuration. Each operation is its own child process, so `close`
//! has nothing to tear down and is trivially idempotent.

use super::{NodeSpec, Transport, TransportError, TunnelStream};
use crate::sink::LineSink;
use crate::subprocess::{run_streaming, run_with_timeout, shell_quote, SubprocessError, TRANSFER_TIMEOUT};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

/// SSH exit code for "could not connect / protocol failure".
const SSH_CONNECT_FAILURE: i32 = 255;

pub struct SshTransport {
    target: String,
    port: Option<u16>,
    identity: Option<PathBuf>,
    closed: AtomicBool,
}

impl SshTransport {
    pub fn new(node: &NodeSpec) -> Self {
        let target = match &node.user {
            Some(user) => format!("{}@{}", user, node.host),
            None => node.host.clone(),
        };
        Self {
            target,
            port: node.port,
            identity: node.identity_file.clone(),
            closed: AtomicBool::new(false),
        }
    }

    fn base_command(&self, program: &str, port_flag: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new");
        if let Some(port) = self.port {
            cmd.arg(port_flag).arg(port.to_string());
        }
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        cmd
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Connection {
                target: self.target.clone(),
                message: "transport closed".to_string(),
            });
        }
        Ok(())
    }

    fn connection_error(&self, message: impl Into<String>) -> TransportError {
        TransportError::Connection {
            target: self.target.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
        env: &HashMap<String, String>,
        sink: Arc<dyn LineSink>,
    ) -> Result<i32, TransportError> {
        self.ensure_open()?;

        // Exports are prefixed onto the remote command so the env
        // crosses the connection without relying on sshd AcceptEnv.
        let mut remote = String::new();
        let mut names: Vec<&String> = env.keys().collect();
        names.sort();
        for name in names {
            remote.push_str(&format!("export {}={}\n", name, shell_quote(&env[name])));
        }
        remote.push_str(command);

        let mut cmd = self.base_command("ssh", "-p");
        cmd.arg(&self.target).arg("--").arg(&remote);

        let exit = run_streaming(cmd, cancel, sink, "ssh run")
            .await
            .map_err(|e| match e {
                SubprocessError::Cancelled { .. } => TransportError::Cancelled,
                other => self.connection_error(other.to_string()),
            })?;
        if exit == SSH_CONNECT_FAILURE {
            return Err(self.connection_error("ssh connection failure (exit 255)"));
        }
        Ok(exit)
    }

    async fn upload(
        &self,
        cancel: &CancellationToken,
        local: &Path,
        remote: &str,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut cmd = self.base_command("scp", "-P");
        cmd.arg("-q")
            .arg(local)
            .arg(format!("{}:{}", self.target, remote));
        self.transfer(cancel, cmd, "upload", remote).await
    }

    async fn download(
        &self,
        cancel: &CancellationToken,
        remote: &str,
        local: &Path,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut cmd = self.base_command("scp", "-P");
        cmd.arg("-q")
            .arg(format!("{}:{}", self.target, remote))
            .arg(local);
        self.transfer(cancel, cmd, "download", remote).await
    }

    async fn dial(
        &self,
        cancel: &CancellationToken,
        network: &str,
        address: &str,
    ) -> Result<Box<dyn TunnelStream>, TransportError> {
        self.ensure_open()?;
        if network != "tcp" {
            return Err(self.connection_error(format!("unsupported network: {network}")));
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let mut cmd = self.base_command("ssh", "-p");
        cmd.arg("-W")
            .arg(address)
            .arg(&self.target)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let mut child = cmd
            .spawn()
            .map_err(|e| self.connection_error(format!("spawn ssh -W: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.connection_error("ssh -W stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.connection_error("ssh -W stdout unavailable"))?;
        Ok(Box::new(SshTunnel {
            _child: child,
            stdin,
            stdout,
        }))
    }

    async fn close(&self) {
        // Per-operation processes; nothing persistent to release.
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl SshTransport {
    async fn transfer(
        &self,
        cancel: &CancellationToken,
        cmd: Command,
        direction: &'static str,
        path: &str,
    ) -> Result<(), TransportError> {
        let output = tokio::select! {
            result = run_with_timeout(cmd, TRANSFER_TIMEOUT, "scp") => {
                result.map_err(|e| self.connection_error(e.to_string()))?
            }
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
        };
        if !output.status.success() {
            return Err(TransportError::Transfer {
                direction,
                path: path.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Duplex stream over an `ssh -W` child's stdio.
struct SshTunnel {
    _child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

impl AsyncRead for SshTunnel {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

impl AsyncWrite for SshTunnel {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stdin).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdin).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdin).poll_shutdown(cx)
    }
}
