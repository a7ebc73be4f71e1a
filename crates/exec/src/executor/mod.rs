// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable action executors.
//!
//! An executor turns one resolved action into an output env map. The
//! contract: `execute` streams child output into the provided sinks and
//! parses the `OUTPUT` file it pointed the action at; `push_file` /
//! `pull_file` move artifacts in and out of the action's working
//! context; `close` is idempotent and releases any held transport. An
//! executor must not leak child processes when cancelled and must not
//! retain the context after `execute` returns.

pub mod container;
pub mod script;

use crate::sink::LineSink;
use crate::subprocess::SubprocessError;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Env var naming the output file an action writes `KEY=VALUE` lines to.
pub const OUTPUT_VAR: &str = "OUTPUT";

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("invalid executor config: {0}")]
    Config(String),
    #[error("action exited with code {0}")]
    Failed(i32),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("executor io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("executor cancelled")]
    Cancelled,
    #[error("unknown executor: {0}")]
    Unknown(String),
}

impl From<SubprocessError> for ExecutorError {
    fn from(e: SubprocessError) -> Self {
        match e {
            SubprocessError::Cancelled { .. } => ExecutorError::Cancelled,
            other => ExecutorError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Transport attachment for node-targeted actions.
#[derive(Clone)]
pub struct RemoteHandle {
    pub transport: Arc<dyn Transport>,
    /// Scratch directory on the remote side for scripts and OUTPUT.
    pub remote_dir: String,
}

/// Construction arguments a factory receives for one action instance.
pub struct ExecutorSpawn {
    /// Action id from the flow definition.
    pub action: String,
    /// Local scratch directory for this (execution, action); cwd for
    /// local runs, staging area for remote ones.
    pub work_dir: PathBuf,
    /// Present when the action targets a node.
    pub remote: Option<RemoteHandle>,
}

/// Everything an executor needs to run one action.
pub struct ExecContext {
    /// Resolved variable bindings; each is exported as an env var of the
    /// same name.
    pub variables: HashMap<String, String>,
    /// The action's opaque `with` configuration.
    pub with: serde_json::Value,
    /// The owning execution's log stream.
    pub sink: Arc<dyn LineSink>,
}

/// One pluggable action runner.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the action and return its parsed output env.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &ExecContext,
    ) -> Result<HashMap<String, String>, ExecutorError>;

    /// Materialize an input artifact into the action's working context.
    async fn push_file(
        &self,
        cancel: &CancellationToken,
        local: &Path,
        logical: &str,
    ) -> Result<(), ExecutorError>;

    /// Collect an output artifact out of the action's working context.
    async fn pull_file(
        &self,
        cancel: &CancellationToken,
        logical: &str,
        local: &Path,
    ) -> Result<(), ExecutorError>;

    /// Release resources (remote transport included). Idempotent.
    async fn close(&self);
}

/// Read and parse the OUTPUT file if the action wrote one.
pub(crate) async fn read_output_file(
    path: &Path,
) -> Result<HashMap<String, String>, ExecutorError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(relay_core::parse_output_env(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(ExecutorError::Io(e)),
    }
}

/// Copy a file into place, creating parent directories. The logical
/// relative path is preserved on both ends.
pub(crate) async fn copy_preserving(
    from: &Path,
    to: &Path,
) -> Result<(), ExecutorError> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(from, to).await?;
    Ok(())
}
