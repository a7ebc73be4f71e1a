// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container executor.
//!
//! Drives the container runtime CLI. The action's work dir is mounted at
//! `/relay` inside the container and the OUTPUT file lives there, so the
//! usual `KEY=VALUE` contract holds without the image knowing anything
//! about the engine. Node-targeted container actions run the same CLI
//! through the node's transport against the remote scratch dir.

use super::{
    read_output_file, ExecContext, Executor, ExecutorError, ExecutorSpawn, RemoteHandle,
    OUTPUT_VAR,
};
use crate::sink::NullSink;
use crate::subprocess::{run_streaming, shell_quote};
use crate::transport::TransportError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Mount point of the work dir inside the container.
const CONTAINER_WORK_DIR: &str = "/relay";

fn default_runtime() -> String {
    "docker".to_string()
}

/// `with` schema for container actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    pub image: String,
    /// Command override (exec form).
    #[serde(default)]
    pub command: Vec<String>,
    /// Runtime CLI (default `docker`).
    #[serde(default = "default_runtime")]
    pub runtime: String,
}

pub(crate) fn validate_config(with: &serde_json::Value) -> Result<(), String> {
    serde_json::from_value::<ContainerConfig>(with.clone())
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub struct ContainerExecutor {
    action: String,
    work_dir: PathBuf,
    remote: Option<RemoteHandle>,
}

impl ContainerExecutor {
    pub fn new(spawn: ExecutorSpawn) -> Self {
        Self {
            action: spawn.action,
            work_dir: spawn.work_dir,
            remote: spawn.remote,
        }
    }

    fn config(&self, with: &serde_json::Value) -> Result<ContainerConfig, ExecutorError> {
        serde_json::from_value(with.clone()).map_err(|e| ExecutorError::Config(e.to_string()))
    }

    /// Arguments after `<runtime>`, shared by local and remote paths.
    fn run_args(
        &self,
        config: &ContainerConfig,
        host_dir: &str,
        variables: &HashMap<String, String>,
    ) -> Vec<String> {
        let output_path = format!("{}/.{}.output", CONTAINER_WORK_DIR, self.action);
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", host_dir, CONTAINER_WORK_DIR),
            "-w".to_string(),
            CONTAINER_WORK_DIR.to_string(),
            "-e".to_string(),
            format!("{}={}", OUTPUT_VAR, output_path),
        ];
        let mut names: Vec<&String> = variables.keys().collect();
        names.sort();
        for name in names {
            args.push("-e".to_string());
            args.push(format!("{}={}", name, variables[name]));
        }
        args.push(config.image.clone());
        args.extend(config.command.iter().cloned());
        args
    }
}

#[async_trait]
impl Executor for ContainerExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &ExecContext,
    ) -> Result<HashMap<String, String>, ExecutorError> {
        let config = self.config(&ctx.with)?;
        match &self.remote {
            None => {
                tokio::fs::create_dir_all(&self.work_dir).await?;
                let host_dir = self.work_dir.display().to_string();
                let args = self.run_args(&config, &host_dir, &ctx.variables);

                let mut cmd = tokio::process::Command::new(&config.runtime);
                cmd.args(&args).current_dir(&self.work_dir);
                let exit = run_streaming(cmd, cancel, ctx.sink.clone(), "container").await?;
                if exit != 0 {
                    return Err(ExecutorError::Failed(exit));
                }
                read_output_file(&self.work_dir.join(format!(".{}.output", self.action))).await
            }
            Some(remote) => {
                let args = self.run_args(&config, &remote.remote_dir, &ctx.variables);
                let command = format!(
                    "mkdir -p {dir} && {runtime} {args}",
                    dir = shell_quote(&remote.remote_dir),
                    runtime = shell_quote(&config.runtime),
                    args = args.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" "),
                );
                let exit = remote
                    .transport
                    .run(cancel, &command, &HashMap::new(), ctx.sink.clone())
                    .await?;
                if exit != 0 {
                    return Err(ExecutorError::Failed(exit));
                }

                tokio::fs::create_dir_all(&self.work_dir).await?;
                let remote_output = format!("{}/.{}.output", remote.remote_dir, self.action);
                let local_output = self.work_dir.join(format!(".{}.output", self.action));
                match remote
                    .transport
                    .download(cancel, &remote_output, &local_output)
                    .await
                {
                    Ok(()) => {}
                    Err(TransportError::Transfer { .. }) => return Ok(HashMap::new()),
                    Err(e) => return Err(e.into()),
                }
                let _ = remote
                    .transport
                    .run(
                        cancel,
                        &format!("rm -f {}", shell_quote(&remote_output)),
                        &HashMap::new(),
                        Arc::new(NullSink),
                    )
                    .await;
                read_output_file(&local_output).await
            }
        }
    }

    async fn push_file(
        &self,
        cancel: &CancellationToken,
        local: &Path,
        logical: &str,
    ) -> Result<(), ExecutorError> {
        // Same artifact layout as the script executor: `push/` and
        // `pull/` inside the working context (mounted at /relay).
        match &self.remote {
            None => super::copy_preserving(local, &self.work_dir.join("push").join(logical)).await,
            Some(remote) => {
                let target = format!("{}/push/{}", remote.remote_dir, logical);
                Ok(remote.transport.upload(cancel, local, &target).await?)
            }
        }
    }

    async fn pull_file(
        &self,
        cancel: &CancellationToken,
        logical: &str,
        local: &Path,
    ) -> Result<(), ExecutorError> {
        match &self.remote {
            None => super::copy_preserving(&self.work_dir.join("pull").join(logical), local).await,
            Some(remote) => {
                if let Some(parent) = local.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let source = format!("{}/pull/{}", remote.remote_dir, logical);
                Ok(remote.transport.download(cancel, &source, local).await?)
            }
        }
    }

    async fn close(&self) {
        if let Some(remote) = &self.remote {
            remote.transport.close().await;
        }
    }
}
