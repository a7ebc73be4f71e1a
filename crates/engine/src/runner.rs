// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-execution action runner.
//!
//! A restartable function from (execution row, flow snapshot, cursor):
//! resolve templates, move artifacts, run the executor, capture OUTPUT,
//! advance. Approval-gated actions suspend by persisting the cursor and
//! returning; the worker is released and resumption re-enters here,
//! possibly on a different worker. An action failure terminates the
//! execution; later actions never run.

use crate::engine::Engine;
use crate::logsink::LogWriter;
use relay_core::{
    ActionOutcome, ApprovalStatus, Clock, ErrorKind, ExecId, ExecStatus, Execution,
};
use relay_exec::{
    ExecContext, ExecutorError, ExecutorSpawn, LineSink, RemoteHandle, StreamKind,
};
use relay_flow::{ActionSpec, Flow, ResolveError, TemplateContext};
use relay_store::StoreError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A classified action failure.
struct ActionFailure {
    kind: ErrorKind,
    message: String,
}

impl ActionFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ResolveError> for ActionFailure {
    fn from(e: ResolveError) -> Self {
        let kind = match &e {
            ResolveError::UnknownReference(_) => ErrorKind::Resolver,
            ResolveError::SecretUnavailable(_) => ErrorKind::SecretUnavailable,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<ExecutorError> for ActionFailure {
    fn from(e: ExecutorError) -> Self {
        let kind = match &e {
            ExecutorError::Cancelled => ErrorKind::Cancelled,
            ExecutorError::Transport(_) => ErrorKind::Transport,
            ExecutorError::Failed(_) => ErrorKind::Executor,
            ExecutorError::Config(_) => ErrorKind::Validation,
            ExecutorError::Io(_) | ExecutorError::Unknown(_) => ErrorKind::Internal,
        };
        Self::new(kind, e.to_string())
    }
}

/// Drive one execution from its cursor to suspension or a terminal
/// status. All persistence goes through the store; the in-memory state
/// here is disposable by design.
pub(crate) async fn run_execution<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    flow: &Flow,
    exec: Execution,
    cancel: CancellationToken,
) {
    let exec_id = exec.id.clone();
    let writer = match engine.logs().writer(exec_id.as_str()) {
        Ok(writer) => writer,
        Err(e) => {
            tracing::error!(exec_id = %exec_id, error = %e, "cannot open log stream");
            finish(engine, &exec_id, ExecStatus::Errored, e.to_string(), Some(ErrorKind::Internal));
            return;
        }
    };

    let mut outputs = exec.outputs.clone();
    let mut index = exec.cursor;
    while index < flow.actions.len() {
        let action = &flow.actions[index];

        if cancel.is_cancelled() {
            fail_execution(engine, &exec_id, &writer, "cancelled", ErrorKind::Cancelled);
            return;
        }

        // Approval gate: suspend before the body unless already granted.
        if action.approval && !approval_granted(engine, &exec_id, &action.id) {
            record_started(engine, &exec_id, &action.id, index);
            record_finished(
                engine,
                &exec_id,
                &action.id,
                index,
                ActionOutcome::AwaitingApproval,
                HashMap::new(),
            );
            if let Err(e) = engine.store().suspend_for_approval(&exec_id, &action.id) {
                fail_execution(engine, &exec_id, &writer, e.to_string(), ErrorKind::Internal);
            }
            // Worker released; resumption re-enters at this cursor.
            return;
        }

        record_started(engine, &exec_id, &action.id, index);
        tracing::info!(exec_id = %exec_id, action = %action.id, index, "running action");

        match run_action(engine, &exec, action, &outputs, writer.clone(), &cancel).await {
            Ok(env) => {
                record_finished(
                    engine,
                    &exec_id,
                    &action.id,
                    index,
                    ActionOutcome::Completed,
                    env.clone(),
                );
                outputs.insert(action.id.clone(), env);
                index += 1;
            }
            Err(failure) => {
                record_finished(
                    engine,
                    &exec_id,
                    &action.id,
                    index,
                    ActionOutcome::Failed(failure.message.clone()),
                    HashMap::new(),
                );
                if failure.kind == ErrorKind::Cancelled {
                    fail_execution(engine, &exec_id, &writer, failure.message, ErrorKind::Cancelled);
                } else {
                    tracing::warn!(
                        exec_id = %exec_id,
                        action = %action.id,
                        kind = %failure.kind,
                        error = %failure.message,
                        "action failed"
                    );
                    fail_execution(engine, &exec_id, &writer, failure.message, failure.kind);
                }
                return;
            }
        }
    }

    finish(engine, &exec_id, ExecStatus::Completed, String::new(), None);
    engine.logs().finish(exec_id.as_str());
    tracing::info!(exec_id = %exec_id, "execution completed");
}

/// Run one action: resolve, connect, push, execute, pull, close.
async fn run_action<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec: &Execution,
    action: &ActionSpec,
    outputs: &HashMap<String, HashMap<String, String>>,
    writer: Arc<LogWriter>,
    cancel: &CancellationToken,
) -> Result<HashMap<String, String>, ActionFailure> {
    let template_ctx = TemplateContext {
        namespace: &exec.namespace,
        inputs: &exec.inputs,
        actions: outputs,
        secrets: engine.secrets.as_ref(),
    };

    // Every input is exported as an env var of the same name; resolved
    // variable bindings are added on top (shadowing on collision).
    // Resolution runs once per field, immediately before dispatch.
    let mut variables = exec.inputs.clone();
    for (name, template) in &action.variables {
        variables.insert(name.clone(), relay_flow::resolve(template, &template_ctx)?);
    }
    let with = resolve_value(&action.with, &template_ctx)?;

    let remote = match &action.node {
        Some(node_name) => {
            let node = engine.node(&exec.namespace, node_name).ok_or_else(|| {
                ActionFailure::new(ErrorKind::Validation, format!("unknown node: {node_name}"))
            })?;
            let transport = engine
                .transports
                .connect(node)
                .map_err(|e| ActionFailure::new(ErrorKind::Transport, e.to_string()))?;
            Some(RemoteHandle {
                transport,
                remote_dir: engine.remote_work_dir(&exec.id, &action.id),
            })
        }
        None => None,
    };

    let executor = engine
        .executors
        .create(
            &action.executor,
            ExecutorSpawn {
                action: action.id.clone(),
                work_dir: engine.action_work_dir(&exec.id, &action.id),
                remote,
            },
        )
        .map_err(ActionFailure::from)?;

    let result = drive_executor(engine, exec, action, variables, with, writer, cancel, executor.as_ref()).await;
    executor.close().await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn drive_executor<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec: &Execution,
    action: &ActionSpec,
    variables: HashMap<String, String>,
    with: serde_json::Value,
    writer: Arc<LogWriter>,
    cancel: &CancellationToken,
    executor: &dyn relay_exec::Executor,
) -> Result<HashMap<String, String>, ActionFailure> {
    let artifacts = engine.artifacts_dir(&exec.id);
    for logical in &action.artifacts.push {
        executor
            .push_file(cancel, &artifacts.join(logical), logical)
            .await?;
    }

    let ctx = ExecContext {
        variables,
        with,
        sink: writer,
    };
    let env = executor.execute(cancel, &ctx).await?;

    for logical in &action.artifacts.pull {
        executor
            .pull_file(cancel, logical, &artifacts.join(logical))
            .await?;
    }
    Ok(env)
}

/// Resolve templates inside every string scalar of a `with` subtree.
fn resolve_value(
    value: &serde_json::Value,
    ctx: &TemplateContext<'_>,
) -> Result<serde_json::Value, ActionFailure> {
    Ok(match value {
        serde_json::Value::String(s) => serde_json::Value::String(relay_flow::resolve(s, ctx)?),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, ctx))
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), resolve_value(item, ctx)?);
            }
            serde_json::Value::Object(out)
        }
        other => other.clone(),
    })
}

fn approval_granted<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec_id: &ExecId,
    action_id: &str,
) -> bool {
    engine.store().read(|s| {
        s.approvals.values().any(|a| {
            a.exec_id == *exec_id
                && a.action_id == action_id
                && a.status == ApprovalStatus::Approved
        })
    })
}

fn record_started<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec_id: &ExecId,
    action_id: &str,
    index: usize,
) {
    if let Err(e) = engine.store().record_action_started(exec_id, action_id, index) {
        tracing::warn!(exec_id = %exec_id, error = %e, "recording action start failed");
    }
}

fn record_finished<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec_id: &ExecId,
    action_id: &str,
    index: usize,
    outcome: ActionOutcome,
    outputs: HashMap<String, String>,
) {
    if let Err(e) =
        engine
            .store()
            .record_action_finished(exec_id, action_id, index, outcome, outputs)
    {
        tracing::warn!(exec_id = %exec_id, error = %e, "recording action finish failed");
    }
}

/// Persist an error/cancel terminal status and surface the error text on
/// the log stream's tail.
fn fail_execution<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec_id: &ExecId,
    writer: &Arc<LogWriter>,
    message: impl Into<String>,
    kind: ErrorKind,
) {
    let message = message.into();
    writer.line(StreamKind::Stderr, &format!("error: {message}"));
    let status = if kind == ErrorKind::Cancelled {
        ExecStatus::Cancelled
    } else {
        ExecStatus::Errored
    };
    finish(engine, exec_id, status, message, Some(kind));
    engine.logs().finish(exec_id.as_str());
}

/// Persist a terminal status, tolerating the already-terminal race.
pub(crate) fn finish<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    exec_id: &ExecId,
    status: ExecStatus,
    message: String,
    kind: Option<ErrorKind>,
) {
    let error = if message.is_empty() { None } else { Some(message) };
    match engine.store().finish_execution(exec_id, status, error, kind) {
        Ok(()) => {}
        // A user cancel can land first; the row is already terminal.
        Err(StoreError::InvalidTransition { .. }) => {
            tracing::debug!(exec_id = %exec_id, "terminal status already persisted");
        }
        Err(e) => tracing::error!(exec_id = %exec_id, error = %e, "persisting terminal status failed"),
    }
}
