// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote transport abstraction.
//!
//! A transport is a client for one target node: run a command, move
//! files both ways, open a tunnelled socket, close. Implementations are
//! registered by protocol name; an action that names a node acquires a
//! client through the registry, while node-less actions bypass it
//! entirely (local execution is the degenerate transport).

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
pub mod ssh;

use crate::sink::LineSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection to {target} failed: {message}")]
    Connection { target: String, message: String },
    #[error("transfer failed ({direction} {path}): {message}")]
    Transfer {
        direction: &'static str,
        path: String,
        message: String,
    },
    #[error("unknown transport protocol: {0}")]
    UnknownProtocol(String),
    #[error("transport cancelled")]
    Cancelled,
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A target node a transport can connect to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    /// Transport protocol; selects the registered factory.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

fn default_protocol() -> String {
    "ssh".to_string()
}

/// A duplex byte stream tunnelled through the transport.
pub trait TunnelStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> TunnelStream for T {}

/// Client for one remote node.
///
/// All operations observe the execution-scoped cancellation token and
/// surface connection failures as [`TransportError`]. `close` is
/// idempotent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a command remotely, streaming stdout/stderr into `sink`.
    /// Returns the remote exit code.
    async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
        env: &HashMap<String, String>,
        sink: Arc<dyn LineSink>,
    ) -> Result<i32, TransportError>;

    /// Upload a local file to a remote path.
    async fn upload(
        &self,
        cancel: &CancellationToken,
        local: &Path,
        remote: &str,
    ) -> Result<(), TransportError>;

    /// Download a remote path to a local file.
    async fn download(
        &self,
        cancel: &CancellationToken,
        remote: &str,
        local: &Path,
    ) -> Result<(), TransportError>;

    /// Open a tunnelled socket to `(network, address)` on the remote
    /// side.
    async fn dial(
        &self,
        cancel: &CancellationToken,
        network: &str,
        address: &str,
    ) -> Result<Box<dyn TunnelStream>, TransportError>;

    /// Release the connection. Idempotent.
    async fn close(&self);
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Transport")
    }
}

type TransportFactory =
    Arc<dyn Fn(&NodeSpec) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync>;

/// Process-wide protocol-name → factory map.
///
/// Populated once at init; registering the same name twice is a
/// programmer error and fails hard.
#[derive(Default)]
pub struct TransportRegistry {
    factories: HashMap<String, TransportFactory>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in protocols registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ssh", |node| Ok(Arc::new(ssh::SshTransport::new(node)) as _));
        registry
    }

    /// Register a protocol factory. Fails hard on duplicates.
    pub fn register(
        &mut self,
        protocol: &str,
        factory: impl Fn(&NodeSpec) -> Result<Arc<dyn Transport>, TransportError>
            + Send
            + Sync
            + 'static,
    ) {
        let existing = self
            .factories
            .insert(protocol.to_string(), Arc::new(factory));
        assert!(
            existing.is_none(),
            "transport protocol registered twice: {protocol}"
        );
    }

    pub fn has_protocol(&self, protocol: &str) -> bool {
        self.factories.contains_key(protocol)
    }

    /// Produce a client for the node's protocol.
    pub fn connect(&self, node: &NodeSpec) -> Result<Arc<dyn Transport>, TransportError> {
        let factory = self
            .factories
            .get(&node.protocol)
            .ok_or_else(|| TransportError::UnknownProtocol(node.protocol.clone()))?;
        factory(node)
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
