// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script executor.
//!
//! Runs an interpreter over an inline script body. Local actions spawn
//! the interpreter directly in the action's work dir; node-targeted
//! actions upload the script to the node's scratch dir, run it through
//! the transport, download the OUTPUT file, and remove the remote temp
//! files afterwards.

use super::{
    copy_preserving, read_output_file, ExecContext, Executor, ExecutorError, ExecutorSpawn,
    RemoteHandle, OUTPUT_VAR,
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

/// `with` schema for script actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    /// Interpreter binary (default `/bin/bash`).
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Script body, executed as a file.
    pub script: String,
}

fn default_interpreter() -> String {
    "/bin/bash".to_string()
}

pub(crate) fn validate_config(with: &serde_json::Value) -> Result<(), String> {
    serde_json::from_value::<ScriptConfig>(with.clone())
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub struct ScriptExecutor {
    action: String,
    work_dir: PathBuf,
    remote: Option<RemoteHandle>,
}

impl ScriptExecutor {
    pub fn new(spawn: ExecutorSpawn) -> Self {
        Self {
            action: spawn.action,
            work_dir: spawn.work_dir,
            remote: spawn.remote,
        }
    }

    fn config(&self, with: &serde_json::Value) -> Result<ScriptConfig, ExecutorError> {
        serde_json::from_value(with.clone()).map_err(|e| ExecutorError::Config(e.to_string()))
    }

    async fn execute_local(
        &self,
        cancel: &CancellationToken,
        ctx: &ExecContext,
        config: &ScriptConfig,
    ) -> Result<HashMap<String, String>, ExecutorError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let script_path = self.work_dir.join(format!(".{}.script", self.action));
        let output_path = self.work_dir.join(format!(".{}.output", self.action));
        tokio::fs::write(&script_path, &config.script).await?;
        let _ = tokio::fs::remove_file(&output_path).await;

        let mut cmd = tokio::process::Command::new(&config.interpreter);
        cmd.arg(&script_path)
            .current_dir(&self.work_dir)
            .envs(&ctx.variables)
            .env(OUTPUT_VAR, &output_path);

        let exit = run_streaming(cmd, cancel, ctx.sink.clone(), "script").await?;
        if exit != 0 {
            return Err(ExecutorError::Failed(exit));
        }
        read_output_file(&output_path).await
    }

    async fn execute_remote(
        &self,
        cancel: &CancellationToken,
        ctx: &ExecContext,
        config: &ScriptConfig,
        remote: &RemoteHandle,
    ) -> Result<HashMap<String, String>, ExecutorError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let local_script = self.work_dir.join(format!(".{}.script", self.action));
        tokio::fs::write(&local_script, &config.script).await?;

        let remote_script = format!("{}/.{}.script", remote.remote_dir, self.action);
        let remote_output = format!("{}/.{}.output", remote.remote_dir, self.action);
        let local_output = self.work_dir.join(format!(".{}.output", self.action));

        remote
            .transport
            .run(
                cancel,
                &format!("mkdir -p {}", shell_quote(&remote.remote_dir)),
                &HashMap::new(),
                Arc::new(NullSink),
            )
            .await?;
        remote
            .transport
            .upload(cancel, &local_script, &remote_script)
            .await?;

        // Run from the scratch dir so artifact paths resolve; the temp
        // script is removed even when the body fails.
        let command = format!(
            "cd {dir} && {output}={out} {interp} {script}; status=$?; rm -f {script}; exit $status",
            dir = shell_quote(&remote.remote_dir),
            output = OUTPUT_VAR,
            out = shell_quote(&remote_output),
            interp = shell_quote(&config.interpreter),
            script = shell_quote(&remote_script),
        );
        let exit = remote
            .transport
            .run(cancel, &command, &ctx.variables, ctx.sink.clone())
            .await?;
        if exit != 0 {
            return Err(ExecutorError::Failed(exit));
        }

        // OUTPUT is optional; a missing remote file parses to empty.
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

#[async_trait]
impl Executor for ScriptExecutor {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        ctx: &ExecContext,
    ) -> Result<HashMap<String, String>, ExecutorError> {
        let config = self.config(&ctx.with)?;
        match &self.remote {
            None => self.execute_local(cancel, ctx, &config).await,
            Some(remote) => self.execute_remote(cancel, ctx, &config, remote).await,
        }
    }

    async fn push_file(
        &self,
        cancel: &CancellationToken,
        local: &Path,
        logical: &str,
    ) -> Result<(), ExecutorError> {
        match &self.remote {
            None => copy_preserving(local, &self.work_dir.join("push").join(logical)).await,
            Some(remote) => {
                let target = format!("{}/push/{}", remote.remote_dir, logical);
                remote
                    .transport
                    .run(
                        cancel,
                        &format!("mkdir -p {}", shell_quote(&parent_of(&target))),
                        &HashMap::new(),
                        Arc::new(NullSink),
                    )
                    .await?;
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
            None => copy_preserving(&self.work_dir.join("pull").join(logical), local).await,
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

fn parent_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent.to_string(),
        _ => ".".to_string(),
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
