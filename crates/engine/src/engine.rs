// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine wiring and public operations.

use crate::approval::ApprovalPolicy;
use crate::error::EngineError;
use crate::logsink::LogSink;
use parking_lot::Mutex;
use relay_core::{
    ApprovalId, Clock, ExecId, Execution, QueueItem, SecretStore, TriggerKind,
};
use relay_exec::{ExecutorRegistry, NodeSpec, TransportRegistry};
use relay_flow::Flow;
use relay_store::{
    DecisionOutcome, EnqueueRequest, IngestOutcome, IngestRequest, Store, SystemScheduleSpec,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Engine tuning knobs. Defaults follow the deployment documentation:
/// worker count = CPU count, 10 s queue sweep, 5 min cron resync.
#[derive(Clone)]
pub struct EngineConfig {
    pub workers: usize,
    pub sweep_interval: Duration,
    pub resync_interval: Duration,
    pub drain_timeout: Duration,
    /// Root for per-(execution, action) scratch dirs and artifacts.
    pub work_root: PathBuf,
    /// Root for per-execution log files.
    pub log_root: PathBuf,
    pub log_retention: Duration,
    pub log_sweep_interval: Duration,
    pub log_max_bytes: u64,
    /// Base of per-(execution, action) scratch dirs on remote nodes.
    pub remote_work_root: String,
    /// Known target nodes, looked up by action `node` references.
    pub nodes: Vec<NodeSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            sweep_interval: Duration::from_secs(10),
            resync_interval: Duration::from_secs(300),
            drain_timeout: Duration::from_secs(5),
            work_root: PathBuf::from("work"),
            log_root: PathBuf::from("logs"),
            log_retention: Duration::from_secs(14 * 24 * 3600),
            log_sweep_interval: Duration::from_secs(3600),
            log_max_bytes: 16 * 1024 * 1024,
            remote_work_root: "/tmp/relay".to_string(),
            nodes: Vec::new(),
        }
    }
}

/// The flow execution engine.
///
/// Owns the dispatcher, worker pool, cron scheduler, and log retention
/// tasks. Construct with [`Engine::new`], call [`Engine::start`] on an
/// `Arc`, and [`Engine::shutdown`] to drain.
pub struct Engine<C: Clock> {
    pub(crate) store: Arc<Store<C>>,
    pub(crate) executors: Arc<ExecutorRegistry>,
    pub(crate) transports: Arc<TransportRegistry>,
    pub(crate) secrets: Arc<dyn SecretStore>,
    pub(crate) policy: Arc<dyn ApprovalPolicy>,
    pub(crate) logs: Arc<LogSink>,
    pub(crate) config: EngineConfig,
    pub(crate) shutdown: CancellationToken,
    /// Cancellation tokens of executions currently running on a worker.
    pub(crate) running: Mutex<HashMap<String, CancellationToken>>,
    tasks: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl<C: Clock + 'static> Engine<C> {
    pub fn new(
        store: Arc<Store<C>>,
        executors: Arc<ExecutorRegistry>,
        transports: Arc<TransportRegistry>,
        secrets: Arc<dyn SecretStore>,
        policy: Arc<dyn ApprovalPolicy>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let logs = Arc::new(LogSink::new(&config.log_root, config.log_max_bytes)?);
        std::fs::create_dir_all(&config.work_root)?;
        Ok(Self {
            store,
            executors,
            transports,
            secrets,
            policy,
            logs,
            config,
            shutdown: CancellationToken::new(),
            running: Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the dispatcher, worker pool, scheduler, and retention tasks.
    pub fn start(self: &Arc<Self>) {
        let (tx, rx) = mpsc::channel::<QueueItem>(self.config.workers.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut tasks = self.tasks.lock();
        tasks.push(tokio::spawn(crate::dispatch::dispatch_loop(
            Arc::clone(self),
            tx,
        )));
        for worker in 0..self.config.workers.max(1) {
            tasks.push(tokio::spawn(crate::worker::worker_loop(
                Arc::clone(self),
                worker,
                Arc::clone(&rx),
            )));
        }
        tasks.push(tokio::spawn(crate::scheduler::scheduler_loop(Arc::clone(
            self,
        ))));
        tasks.push(tokio::spawn(crate::logsink::retention_loop(
            Arc::clone(&self.logs),
            self.config.log_retention,
            self.config.log_sweep_interval,
            self.shutdown.clone(),
        )));
        tracing::info!(workers = self.config.workers, "engine started");
    }

    /// Graceful drain: stop intake, cancel in-flight executions, wait up
    /// to the drain deadline. Runners still active past the deadline are
    /// abandoned; the boot sweep marks their rows on next start.
    pub async fn shutdown(&self) {
        tracing::info!("engine shutting down");
        self.shutdown.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        let drain = async {
            for task in tasks {
                let _ = task.await;
            }
        };
        if tokio::time::timeout(self.config.drain_timeout, drain)
            .await
            .is_err()
        {
            tracing::warn!("drain deadline exceeded; abandoning in-flight runners");
        }
    }

    pub fn logs(&self) -> &Arc<LogSink> {
        &self.logs
    }

    pub fn store(&self) -> &Arc<Store<C>> {
        &self.store
    }

    // ── catalog ──────────────────────────────────────────────────────

    /// Parse, validate, and ingest one flow source file.
    pub fn ingest_source(
        &self,
        namespace: &str,
        path: &Path,
        source: &str,
    ) -> Result<IngestOutcome, EngineError> {
        let format = relay_flow::format_for_path(path)?;
        let flow = relay_flow::parse_flow(source, format)?;
        relay_flow::validate_flow(&flow, self.executors.as_ref())?;

        let request = IngestRequest {
            namespace: namespace.to_string(),
            slug: flow.metadata.id.clone(),
            name: flow.metadata.name.clone(),
            description: flow.metadata.description.clone(),
            user_schedulable: flow.metadata.user_schedulable,
            path: path.to_path_buf(),
            checksum: relay_flow::checksum(source),
            format,
            source: source.to_string(),
            schedules: flow
                .schedules
                .iter()
                .map(|s| SystemScheduleSpec {
                    expression: s.expression.clone(),
                    timezone: s.timezone.clone(),
                    inputs: s.inputs.clone(),
                    active: s.active,
                })
                .collect(),
        };
        Ok(self.store.ingest_flow(request)?)
    }

    /// Hydrate the flow model an execution (or queue item) pinned.
    pub(crate) fn hydrate(&self, checksum: &str) -> Result<Flow, EngineError> {
        let snapshot = self
            .store
            .flow_snapshot(checksum)
            .ok_or_else(|| relay_store::StoreError::UnknownSnapshot(checksum.to_string()))?;
        Ok(relay_flow::parse_flow(&snapshot.source, snapshot.format)?)
    }

    // ── enqueue ──────────────────────────────────────────────────────

    /// Validate inputs against the flow's current snapshot and insert a
    /// queue row.
    pub fn enqueue(
        &self,
        namespace: &str,
        flow_slug: &str,
        inputs: HashMap<String, String>,
        trigger: TriggerKind,
        triggered_by: Option<&str>,
    ) -> Result<QueueItem, EngineError> {
        self.enqueue_at(namespace, flow_slug, inputs, trigger, triggered_by, None)
    }

    pub(crate) fn enqueue_at(
        &self,
        namespace: &str,
        flow_slug: &str,
        inputs: HashMap<String, String>,
        trigger: TriggerKind,
        triggered_by: Option<&str>,
        scheduled_at_ms: Option<u64>,
    ) -> Result<QueueItem, EngineError> {
        let record = self.store.flow_record(namespace, flow_slug).ok_or({
            relay_store::StoreError::UnknownFlow {
                namespace: namespace.to_string(),
                slug: flow_slug.to_string(),
            }
        })?;
        let flow = self.hydrate(&record.checksum)?;
        let effective = relay_flow::validate_inputs(&flow.inputs, &inputs)?;
        Ok(self.store.enqueue(EnqueueRequest {
            namespace: namespace.to_string(),
            flow_slug: flow_slug.to_string(),
            inputs: effective,
            trigger,
            triggered_by: triggered_by.map(str::to_string),
            scheduled_at_ms,
        })?)
    }

    /// Create a user schedule, validating the cron expression and
    /// timezone at the API boundary. The store enforces the flow's
    /// user-schedulable flag.
    pub fn create_user_schedule(
        &self,
        namespace: &str,
        flow_slug: &str,
        expression: &str,
        timezone: &str,
        inputs: HashMap<String, String>,
        created_by: &str,
    ) -> Result<relay_core::ScheduleRecord, EngineError> {
        relay_flow::parse_expression(expression)?;
        relay_flow::parse_timezone(timezone)?;
        Ok(self.store.create_user_schedule(
            namespace,
            flow_slug,
            SystemScheduleSpec {
                expression: expression.to_string(),
                timezone: timezone.to_string(),
                inputs,
                active: true,
            },
            created_by,
        )?)
    }

    /// Re-enqueue a finished execution's flow and inputs as a new run.
    pub fn rerun(&self, exec_id: &ExecId, user: &str) -> Result<QueueItem, EngineError> {
        let exec = self
            .store
            .execution(exec_id)
            .ok_or_else(|| EngineError::UnknownExecution(exec_id.clone()))?;
        self.enqueue(
            &exec.namespace,
            &exec.flow_slug,
            exec.inputs,
            TriggerKind::Rerun,
            Some(user),
        )
    }

    // ── execution control ────────────────────────────────────────────

    pub fn execution(&self, id: &ExecId) -> Option<Execution> {
        self.store.execution(id)
    }

    /// Cancel an execution: running ones get their token fired (the
    /// runner persists the terminal row); suspended ones are flipped
    /// directly.
    pub fn cancel(&self, id: &ExecId, reason: &str) -> Result<(), EngineError> {
        if let Some(token) = self.running.lock().get(id.as_str()) {
            tracing::info!(exec_id = %id, "cancelling running execution");
            token.cancel();
            return Ok(());
        }
        Ok(self.store.cancel_execution(id, reason)?)
    }

    /// Decide a pending approval on behalf of `user`.
    pub fn decide(
        &self,
        approval: &ApprovalId,
        approve: bool,
        user: &str,
        note: Option<String>,
    ) -> Result<DecisionOutcome, EngineError> {
        let request = self
            .store
            .approval(approval)
            .ok_or(relay_store::StoreError::UnknownApproval(approval.clone()))?;
        if !self.policy.can_decide(user, &request.namespace) {
            return Err(EngineError::Forbidden {
                user: user.to_string(),
                namespace: request.namespace.clone(),
            });
        }
        Ok(self
            .store
            .decide_approval(approval, approve, user, note)?)
    }

    // ── paths ────────────────────────────────────────────────────────

    /// Local scratch dir for one (execution, action).
    pub(crate) fn action_work_dir(&self, exec_id: &ExecId, action_id: &str) -> PathBuf {
        self.config.work_root.join(exec_id.as_str()).join(action_id)
    }

    /// Execution-scoped artifact store, shared by its actions.
    pub(crate) fn artifacts_dir(&self, exec_id: &ExecId) -> PathBuf {
        self.config.work_root.join(exec_id.as_str()).join("artifacts")
    }

    /// Remote scratch dir for one (execution, action).
    pub(crate) fn remote_work_dir(&self, exec_id: &ExecId, action_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.remote_work_root,
            exec_id.as_str(),
            action_id
        )
    }

    pub(crate) fn node(&self, namespace: &str, name: &str) -> Option<&NodeSpec> {
        self.config
            .nodes
            .iter()
            .find(|n| n.name == name && (n.namespace.is_empty() || n.namespace == namespace))
    }
}
