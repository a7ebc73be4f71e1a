// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable store.
//!
//! One mutex guards the WAL and the materialized state; every public
//! mutation builds a batch of events under that lock, appends and
//! flushes them, then applies them to state. A batch is the unit of
//! atomicity, the "short transaction" of the system (claim,
//! exec-create + queue-delete, decision + re-enqueue). Notifications
//! fire after the lock is released.

use crate::notify::{Notifier, NEW_FLOW_CHANNEL};
use crate::snapshot::{self, SnapshotError};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use parking_lot::Mutex;
use relay_core::{
    scoped_name, ActionOutcome, ApprovalId, ApprovalRequest, ApprovalStatus, Clock, ErrorKind,
    Event, ExecId, ExecStatus, Execution, FlowRecord, FlowSnapshot, QueueItem, ScheduleId,
    ScheduleRecord, SourceFormat, TriggerKind,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const WAL_FILE: &str = "relay.wal";
const SNAPSHOT_FILE: &str = "state.snapshot.zst";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Wal(#[from] WalError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("unknown flow: {namespace}/{slug}")]
    UnknownFlow { namespace: String, slug: String },
    #[error("unknown flow snapshot: {0}")]
    UnknownSnapshot(String),
    #[error("queue item {0} is gone")]
    QueueItemGone(u64),
    #[error("queue item {seq} already claimed by {by}")]
    AlreadyClaimed { seq: u64, by: String },
    #[error("unknown execution: {0}")]
    UnknownExecution(ExecId),
    #[error("unknown approval: {0}")]
    UnknownApproval(ApprovalId),
    #[error("approval {id} already decided: {status}")]
    ApprovalConflict { id: ApprovalId, status: ApprovalStatus },
    #[error("unknown schedule: {0}")]
    UnknownSchedule(ScheduleId),
    #[error("flow {0} does not allow user schedules")]
    UserSchedulingDisabled(String),
    #[error("invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ExecId,
        from: ExecStatus,
        to: ExecStatus,
    },
}

/// Everything the catalog needs to ingest one flow source file.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub namespace: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub user_schedulable: bool,
    pub path: PathBuf,
    pub checksum: String,
    pub format: SourceFormat,
    pub source: String,
    pub schedules: Vec<SystemScheduleSpec>,
}

/// A system schedule extracted from the flow document.
#[derive(Debug, Clone)]
pub struct SystemScheduleSpec {
    pub expression: String,
    pub timezone: String,
    pub inputs: HashMap<String, String>,
    pub active: bool,
}

/// What ingest did with the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Created,
    Updated,
    Unchanged,
}

/// A request to start an execution of a flow.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub namespace: String,
    pub flow_slug: String,
    pub inputs: HashMap<String, String>,
    pub trigger: TriggerKind,
    pub triggered_by: Option<String>,
    pub scheduled_at_ms: Option<u64>,
}

/// Result of an approval decision.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub request: ApprovalRequest,
    /// Seq of the resume queue row (approvals only).
    pub resumed_seq: Option<u64>,
}

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

impl Inner {
    /// Append, flush, and apply one batch. The caller holds the lock,
    /// so the batch is atomic with respect to every other mutation.
    fn commit(&mut self, events: Vec<Event>) -> Result<(), StoreError> {
        for event in &events {
            self.wal.append(event)?;
        }
        self.wal.flush()?;
        for event in &events {
            tracing::debug!(event = event.name(), "commit");
            self.state.apply_event(event);
        }
        Ok(())
    }
}

/// Durable store for the queue, execution log, approvals, flow catalog,
/// and schedules.
pub struct Store<C: Clock> {
    inner: Mutex<Inner>,
    notifier: Notifier,
    dir: PathBuf,
    clock: C,
}

impl<C: Clock> Store<C> {
    /// Open the store, replaying snapshot + WAL tail, then run the boot
    /// sweep: orphaned `running` executions are marked errored with the
    /// worker-abandoned code, and stale queue claims are released so the
    /// rows become claimable again (at-least-once).
    pub fn open(dir: &Path, clock: C) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(WalError::Io)?;
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let (mut state, processed_seq) = match snapshot::load(&snapshot_path)? {
            Some((state, seq)) => (state, seq),
            None => (MaterializedState::default(), 0),
        };

        let (wal, entries) = Wal::open(&dir.join(WAL_FILE), processed_seq)?;
        let replayed = entries.len();
        for entry in entries {
            state.apply_event(&entry.event);
        }
        if replayed > 0 {
            tracing::info!(replayed, "replayed WAL tail");
        }

        let store = Self {
            inner: Mutex::new(Inner { wal, state }),
            notifier: Notifier::new(),
            dir: dir.to_path_buf(),
            clock,
        };
        store.boot_sweep()?;
        Ok(store)
    }

    fn boot_sweep(&self) -> Result<(), StoreError> {
        let at_ms = self.clock.epoch_ms();
        let mut inner = self.inner.lock();
        let mut events = Vec::new();
        for exec in inner.state.executions.values() {
            if exec.status == ExecStatus::Running {
                tracing::warn!(exec_id = %exec.id, "orphaned running execution from previous boot");
                events.push(Event::ExecStatusChanged {
                    id: exec.id.clone(),
                    status: ExecStatus::Errored,
                    error: Some("worker-abandoned".to_string()),
                    error_kind: Some(ErrorKind::WorkerAbandoned),
                    at_ms,
                });
            }
        }
        for item in inner.state.queue.values() {
            if item.is_claimed() {
                tracing::warn!(seq = item.seq, "releasing stale queue claim");
                events.push(Event::QueueReleased { seq: item.seq });
            }
        }
        if events.is_empty() {
            Ok(())
        } else {
            inner.commit(events)
        }
    }

    /// Run a read-only closure against the materialized state.
    pub fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        f(&self.inner.lock().state)
    }

    /// Build a batch from current state and commit it, all under one
    /// lock acquisition.
    fn commit_with<T>(
        &self,
        build: impl FnOnce(&MaterializedState) -> Result<(Vec<Event>, T), StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = self.inner.lock();
        let (events, out) = build(&inner.state)?;
        inner.commit(events)?;
        Ok(out)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Write a snapshot of current state and start a fresh WAL.
    pub fn compact(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let seq = inner.wal.write_seq();
        snapshot::save(&self.dir.join(SNAPSHOT_FILE), &inner.state, seq)?;
        let wal_path = self.dir.join(WAL_FILE);
        std::fs::remove_file(&wal_path).map_err(WalError::Io)?;
        // An empty WAL opened at `seq` keeps the sequence monotonic
        // across the compaction.
        let (wal, _) = Wal::open(&wal_path, seq)?;
        inner.wal = wal;
        tracing::info!(seq, "compacted store");
        Ok(())
    }

    // ── flow catalog ─────────────────────────────────────────────────

    /// Ingest one flow source file.
    ///
    /// Unchanged checksum is a no-op. Otherwise the catalog row and
    /// snapshot are written and the flow's *system* schedules are diffed
    /// against the declared set: unchanged triggers are kept (no churn),
    /// vanished ones are purged, new ones created. User schedules are
    /// never touched here.
    pub fn ingest_flow(&self, request: IngestRequest) -> Result<IngestOutcome, StoreError> {
        let at_ms = self.clock.epoch_ms();
        self.commit_with(|state| {
            let key = scoped_name(&request.namespace, &request.slug);
            let outcome = match state.flows.get(&key) {
                None => IngestOutcome::Created,
                Some(record) if record.checksum != request.checksum => IngestOutcome::Updated,
                Some(_) => return Ok((Vec::new(), IngestOutcome::Unchanged)),
            };

            let record = FlowRecord {
                slug: request.slug.clone(),
                namespace: request.namespace.clone(),
                name: request.name.clone(),
                description: request.description.clone(),
                checksum: request.checksum.clone(),
                path: request.path.clone(),
                user_schedulable: request.user_schedulable,
                ingested_at_ms: at_ms,
            };
            let snapshot = FlowSnapshot {
                checksum: request.checksum.clone(),
                format: request.format,
                source: request.source.clone(),
            };

            let mut events = vec![Event::FlowIngested { record, snapshot }];
            events.extend(schedule_diff_events(
                state,
                &request.namespace,
                &request.slug,
                &request.schedules,
            ));
            Ok((events, outcome))
        })
    }

    pub fn flow_record(&self, namespace: &str, slug: &str) -> Option<FlowRecord> {
        let key = scoped_name(namespace, slug);
        self.read(|s| s.flows.get(&key).cloned())
    }

    pub fn flow_snapshot(&self, checksum: &str) -> Option<FlowSnapshot> {
        self.read(|s| s.snapshots.get(checksum).cloned())
    }

    pub fn list_flows(&self, namespace: &str) -> Vec<FlowRecord> {
        let mut flows = self.read(|s| {
            s.flows
                .values()
                .filter(|f| f.namespace == namespace)
                .cloned()
                .collect::<Vec<_>>()
        });
        flows.sort_by(|a, b| a.slug.cmp(&b.slug));
        flows
    }

    // ── schedules ────────────────────────────────────────────────────

    /// Create a user schedule. Rejected when the flow disables user
    /// scheduling.
    pub fn create_user_schedule(
        &self,
        namespace: &str,
        flow_slug: &str,
        spec: SystemScheduleSpec,
        created_by: &str,
    ) -> Result<ScheduleRecord, StoreError> {
        self.commit_with(|state| {
            let key = scoped_name(namespace, flow_slug);
            let record = state.flows.get(&key).ok_or_else(|| StoreError::UnknownFlow {
                namespace: namespace.to_string(),
                slug: flow_slug.to_string(),
            })?;
            if !record.user_schedulable {
                return Err(StoreError::UserSchedulingDisabled(flow_slug.to_string()));
            }
            let schedule = ScheduleRecord {
                id: ScheduleId::new(),
                namespace: namespace.to_string(),
                flow_slug: flow_slug.to_string(),
                expression: spec.expression,
                timezone: spec.timezone,
                system: false,
                active: spec.active,
                inputs: spec.inputs,
                created_by: Some(created_by.to_string()),
            };
            Ok((
                vec![Event::ScheduleCreated {
                    record: schedule.clone(),
                }],
                schedule,
            ))
        })
    }

    pub fn set_schedule_active(&self, id: &ScheduleId, active: bool) -> Result<(), StoreError> {
        self.commit_with(|state| {
            if !state.schedules.contains_key(id.as_str()) {
                return Err(StoreError::UnknownSchedule(id.clone()));
            }
            Ok((
                vec![Event::ScheduleSetActive {
                    id: id.clone(),
                    active,
                }],
                (),
            ))
        })
    }

    pub fn remove_schedule(&self, id: &ScheduleId) -> Result<(), StoreError> {
        self.commit_with(|state| {
            if !state.schedules.contains_key(id.as_str()) {
                return Err(StoreError::UnknownSchedule(id.clone()));
            }
            Ok((vec![Event::ScheduleRemoved { id: id.clone() }], ()))
        })
    }

    /// Schedules the cron loop should arm: active rows, minus user
    /// schedules on flows that suppress them.
    pub fn active_schedules(&self) -> Vec<ScheduleRecord> {
        self.read(|s| {
            let mut schedules: Vec<_> = s
                .schedules
                .values()
                .filter(|sched| sched.active)
                .filter(|sched| {
                    if sched.system {
                        return true;
                    }
                    let key = scoped_name(&sched.namespace, &sched.flow_slug);
                    s.flows.get(&key).map(|f| f.user_schedulable).unwrap_or(false)
                })
                .cloned()
                .collect();
            schedules.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
            schedules
        })
    }

    // ── queue ────────────────────────────────────────────────────────

    /// Insert a pending row and fire the `new_flow` notification with
    /// the decimal row seq as payload.
    pub fn enqueue(&self, request: EnqueueRequest) -> Result<QueueItem, StoreError> {
        let at_ms = self.clock.epoch_ms();
        let item = self.commit_with(|state| {
            let key = scoped_name(&request.namespace, &request.flow_slug);
            let record = state.flows.get(&key).ok_or_else(|| StoreError::UnknownFlow {
                namespace: request.namespace.clone(),
                slug: request.flow_slug.clone(),
            })?;
            let item = QueueItem {
                seq: state.last_queue_seq + 1,
                uuid: uuid::Uuid::new_v4().to_string(),
                namespace: request.namespace.clone(),
                flow_slug: request.flow_slug.clone(),
                snapshot: record.checksum.clone(),
                inputs: request.inputs.clone(),
                trigger: request.trigger,
                triggered_by: request.triggered_by.clone(),
                scheduled_at_ms: request.scheduled_at_ms,
                resume_exec: None,
                enqueued_at_ms: at_ms,
                claimed_at_ms: None,
                claimed_by: None,
            };
            Ok((
                vec![Event::QueueEnqueued { item: item.clone() }],
                item,
            ))
        })?;
        self.notifier.notify(NEW_FLOW_CHANNEL, item.seq.to_string());
        tracing::info!(seq = item.seq, flow = %item.flow_slug, trigger = %item.trigger, "enqueued");
        Ok(item)
    }

    /// Atomically claim one specific row.
    ///
    /// Fails with [`StoreError::QueueItemGone`] when the row was already
    /// consumed and [`StoreError::AlreadyClaimed`] when another claimant
    /// won the race. Both are normal under notify/sweep overlap.
    pub fn claim(&self, seq: u64, worker: &str) -> Result<QueueItem, StoreError> {
        let at_ms = self.clock.epoch_ms();
        self.commit_with(|state| {
            let item = state
                .queue
                .get(&seq)
                .ok_or(StoreError::QueueItemGone(seq))?;
            if let Some(by) = &item.claimed_by {
                return Err(StoreError::AlreadyClaimed {
                    seq,
                    by: by.clone(),
                });
            }
            let mut claimed = item.clone();
            claimed.claimed_by = Some(worker.to_string());
            claimed.claimed_at_ms = Some(at_ms);
            Ok((
                vec![Event::QueueClaimed {
                    seq,
                    worker: worker.to_string(),
                    at_ms,
                }],
                claimed,
            ))
        })
    }

    /// Claim up to `limit` pending rows in enqueue order (the sweep path).
    pub fn claim_pending(&self, limit: usize, worker: &str) -> Result<Vec<QueueItem>, StoreError> {
        let at_ms = self.clock.epoch_ms();
        self.commit_with(|state| {
            let mut events = Vec::new();
            let mut claimed = Vec::new();
            for item in state.pending_queue().take(limit) {
                events.push(Event::QueueClaimed {
                    seq: item.seq,
                    worker: worker.to_string(),
                    at_ms,
                });
                let mut row = item.clone();
                row.claimed_by = Some(worker.to_string());
                row.claimed_at_ms = Some(at_ms);
                claimed.push(row);
            }
            Ok((events, claimed))
        })
    }

    pub fn pending_count(&self) -> usize {
        self.read(|s| s.pending_queue().count())
    }

    // ── executions ───────────────────────────────────────────────────

    /// Turn a claimed queue item into a running execution.
    ///
    /// Fresh items create the execution row; resume items flip the
    /// suspended execution back to running. Either way the queue row is
    /// deleted in the same batch, so a crash before this point leaves
    /// the row claimable and a crash after it leaves exactly one
    /// execution.
    pub fn start_execution(&self, item: &QueueItem) -> Result<Execution, StoreError> {
        let at_ms = self.clock.epoch_ms();
        match &item.resume_exec {
            Some(exec_id) => self.commit_with(|state| {
                let exec = state
                    .executions
                    .get(exec_id.as_str())
                    .ok_or_else(|| StoreError::UnknownExecution(exec_id.clone()))?;
                if !exec.status.can_transition_to(ExecStatus::Running) {
                    // Cancelled while suspended. Consume the row and
                    // hand back the terminal row; the worker skips it.
                    return Ok((vec![Event::QueueRemoved { seq: item.seq }], exec.clone()));
                }
                let mut resumed = exec.clone();
                resumed.status = ExecStatus::Running;
                Ok((
                    vec![
                        Event::ExecStatusChanged {
                            id: exec_id.clone(),
                            status: ExecStatus::Running,
                            error: None,
                            error_kind: None,
                            at_ms,
                        },
                        Event::QueueRemoved { seq: item.seq },
                    ],
                    resumed,
                ))
            }),
            None => self.commit_with(|_state| {
                let mut execution = Execution {
                    id: ExecId::new(),
                    namespace: item.namespace.clone(),
                    flow_slug: item.flow_slug.clone(),
                    snapshot: item.snapshot.clone(),
                    inputs: item.inputs.clone(),
                    outputs: HashMap::new(),
                    trigger: item.trigger,
                    triggered_by: item.triggered_by.clone(),
                    scheduled_at_ms: item.scheduled_at_ms,
                    started_at_ms: at_ms,
                    completed_at_ms: None,
                    status: ExecStatus::Pending,
                    error: None,
                    error_kind: None,
                    cursor: 0,
                    actions: Vec::new(),
                };
                let events = vec![
                    Event::ExecCreated {
                        execution: execution.clone(),
                    },
                    Event::ExecStatusChanged {
                        id: execution.id.clone(),
                        status: ExecStatus::Running,
                        error: None,
                        error_kind: None,
                        at_ms,
                    },
                    Event::QueueRemoved { seq: item.seq },
                ];
                execution.status = ExecStatus::Running;
                Ok((events, execution))
            }),
        }
    }

    pub fn execution(&self, id: &ExecId) -> Option<Execution> {
        self.read(|s| s.executions.get(id.as_str()).cloned())
    }

    pub fn record_action_started(
        &self,
        id: &ExecId,
        action_id: &str,
        index: usize,
    ) -> Result<(), StoreError> {
        self.commit_with(|_| {
            Ok((
                vec![Event::ActionStarted {
                    exec_id: id.clone(),
                    action_id: action_id.to_string(),
                    index,
                    at_ms: self.clock.epoch_ms(),
                }],
                (),
            ))
        })
    }

    pub fn record_action_finished(
        &self,
        id: &ExecId,
        action_id: &str,
        index: usize,
        outcome: ActionOutcome,
        outputs: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        self.commit_with(|_| {
            Ok((
                vec![Event::ActionFinished {
                    exec_id: id.clone(),
                    action_id: action_id.to_string(),
                    index,
                    outcome,
                    outputs,
                    at_ms: self.clock.epoch_ms(),
                }],
                (),
            ))
        })
    }

    /// Persist a terminal status.
    pub fn finish_execution(
        &self,
        id: &ExecId,
        status: ExecStatus,
        error: Option<String>,
        error_kind: Option<ErrorKind>,
    ) -> Result<(), StoreError> {
        let at_ms = self.clock.epoch_ms();
        self.commit_with(|state| {
            let exec = state
                .executions
                .get(id.as_str())
                .ok_or_else(|| StoreError::UnknownExecution(id.clone()))?;
            if !exec.status.can_transition_to(status) {
                return Err(StoreError::InvalidTransition {
                    id: id.clone(),
                    from: exec.status,
                    to: status,
                });
            }
            Ok((
                vec![Event::ExecStatusChanged {
                    id: id.clone(),
                    status,
                    error,
                    error_kind,
                    at_ms,
                }],
                (),
            ))
        })
    }

    /// Cancel an execution. Pending approvals for it are auto-rejected
    /// in the same batch so no orphaned pending rows survive.
    pub fn cancel_execution(&self, id: &ExecId, reason: &str) -> Result<(), StoreError> {
        let at_ms = self.clock.epoch_ms();
        self.commit_with(|state| {
            let exec = state
                .executions
                .get(id.as_str())
                .ok_or_else(|| StoreError::UnknownExecution(id.clone()))?;
            if !exec.status.can_transition_to(ExecStatus::Cancelled) {
                return Err(StoreError::InvalidTransition {
                    id: id.clone(),
                    from: exec.status,
                    to: ExecStatus::Cancelled,
                });
            }
            let mut events = Vec::new();
            for approval in state.approvals.values() {
                if approval.exec_id == *id && !approval.is_decided() {
                    events.push(Event::ApprovalDecided {
                        id: approval.id.clone(),
                        status: ApprovalStatus::Rejected,
                        decided_by: "system".to_string(),
                        note: Some("execution cancelled".to_string()),
                        at_ms,
                    });
                }
            }
            events.push(Event::ExecStatusChanged {
                id: id.clone(),
                status: ExecStatus::Cancelled,
                error: Some(reason.to_string()),
                error_kind: Some(ErrorKind::Cancelled),
                at_ms,
            });
            Ok((events, ()))
        })
    }

    // ── approvals ────────────────────────────────────────────────────

    /// Suspend an execution on a human decision.
    ///
    /// Creates the approval row and flips the execution to
    /// awaiting-approval in one batch. Idempotent: an existing pending
    /// row for (execution, action) is returned as-is, preserving the
    /// at-most-one-pending invariant.
    pub fn suspend_for_approval(
        &self,
        exec_id: &ExecId,
        action_id: &str,
    ) -> Result<ApprovalRequest, StoreError> {
        let at_ms = self.clock.epoch_ms();
        let request = self.commit_with(|state| {
            let exec = state
                .executions
                .get(exec_id.as_str())
                .ok_or_else(|| StoreError::UnknownExecution(exec_id.clone()))?;
            if let Some(existing) = state.pending_approval_for(exec_id.as_str(), action_id) {
                return Ok((Vec::new(), existing.clone()));
            }
            if !exec.status.can_transition_to(ExecStatus::AwaitingApproval) {
                return Err(StoreError::InvalidTransition {
                    id: exec_id.clone(),
                    from: exec.status,
                    to: ExecStatus::AwaitingApproval,
                });
            }
            let request = ApprovalRequest {
                id: ApprovalId::new(),
                exec_id: exec_id.clone(),
                action_id: action_id.to_string(),
                namespace: exec.namespace.clone(),
                status: ApprovalStatus::Pending,
                decided_by: None,
                note: None,
                created_at_ms: at_ms,
                decided_at_ms: None,
            };
            Ok((
                vec![
                    Event::ApprovalRequested {
                        request: request.clone(),
                    },
                    Event::ExecStatusChanged {
                        id: exec_id.clone(),
                        status: ExecStatus::AwaitingApproval,
                        error: None,
                        error_kind: None,
                        at_ms,
                    },
                ],
                request,
            ))
        })?;
        tracing::info!(exec_id = %exec_id, action = action_id, approval = %request.id, "awaiting approval");
        Ok(request)
    }

    pub fn approval(&self, id: &ApprovalId) -> Option<ApprovalRequest> {
        self.read(|s| s.approvals.get(id.as_str()).cloned())
    }

    pub fn pending_approval_for(
        &self,
        exec_id: &ExecId,
        action_id: &str,
    ) -> Option<ApprovalRequest> {
        self.read(|s| s.pending_approval_for(exec_id.as_str(), action_id).cloned())
    }

    /// Decide a pending approval.
    ///
    /// Approve re-enqueues the execution for resumption at its cursor;
    /// reject cancels it with the decider's note as the error text.
    /// Decision, execution update, and re-enqueue are one batch. A
    /// second decision is a conflict.
    pub fn decide_approval(
        &self,
        id: &ApprovalId,
        approve: bool,
        decided_by: &str,
        note: Option<String>,
    ) -> Result<DecisionOutcome, StoreError> {
        let at_ms = self.clock.epoch_ms();
        let outcome = self.commit_with(|state| {
            let approval = state
                .approvals
                .get(id.as_str())
                .ok_or_else(|| StoreError::UnknownApproval(id.clone()))?;
            if approval.is_decided() {
                return Err(StoreError::ApprovalConflict {
                    id: id.clone(),
                    status: approval.status,
                });
            }
            let exec = state
                .executions
                .get(approval.exec_id.as_str())
                .ok_or_else(|| StoreError::UnknownExecution(approval.exec_id.clone()))?;

            let status = if approve {
                ApprovalStatus::Approved
            } else {
                ApprovalStatus::Rejected
            };
            let mut decided = approval.clone();
            decided.status = status;
            decided.decided_by = Some(decided_by.to_string());
            decided.note = note.clone();
            decided.decided_at_ms = Some(at_ms);

            let mut events = vec![Event::ApprovalDecided {
                id: id.clone(),
                status,
                decided_by: decided_by.to_string(),
                note: note.clone(),
                at_ms,
            }];

            let mut resumed_seq = None;
            if approve {
                let seq = state.last_queue_seq + 1;
                resumed_seq = Some(seq);
                events.push(Event::QueueEnqueued {
                    item: QueueItem {
                        seq,
                        uuid: uuid::Uuid::new_v4().to_string(),
                        namespace: exec.namespace.clone(),
                        flow_slug: exec.flow_slug.clone(),
                        snapshot: exec.snapshot.clone(),
                        inputs: exec.inputs.clone(),
                        trigger: exec.trigger,
                        triggered_by: exec.triggered_by.clone(),
                        scheduled_at_ms: None,
                        resume_exec: Some(exec.id.clone()),
                        enqueued_at_ms: at_ms,
                        claimed_at_ms: None,
                        claimed_by: None,
                    },
                });
            } else {
                events.push(Event::ExecStatusChanged {
                    id: exec.id.clone(),
                    status: ExecStatus::Cancelled,
                    error: note.clone(),
                    error_kind: Some(ErrorKind::Cancelled),
                    at_ms,
                });
            }

            Ok((
                events,
                DecisionOutcome {
                    request: decided,
                    resumed_seq,
                },
            ))
        })?;

        if let Some(seq) = outcome.resumed_seq {
            self.notifier.notify(NEW_FLOW_CHANNEL, seq.to_string());
        }
        tracing::info!(approval = %id, approved = approve, decided_by, "approval decided");
        Ok(outcome)
    }
}

/// Diff declared system schedules against stored ones.
fn schedule_diff_events(
    state: &MaterializedState,
    namespace: &str,
    slug: &str,
    declared: &[SystemScheduleSpec],
) -> Vec<Event> {
    let existing = state.system_schedules_for(namespace, slug);

    let mut events = Vec::new();
    let mut kept: Vec<&ScheduleRecord> = Vec::new();
    for spec in declared {
        let candidate = ScheduleRecord {
            id: ScheduleId::new(),
            namespace: namespace.to_string(),
            flow_slug: slug.to_string(),
            expression: spec.expression.clone(),
            timezone: spec.timezone.clone(),
            system: true,
            active: spec.active,
            inputs: spec.inputs.clone(),
            created_by: None,
        };
        match existing
            .iter()
            .find(|e| e.trigger_key() == candidate.trigger_key())
        {
            Some(unchanged) => {
                kept.push(unchanged);
                if unchanged.active != spec.active {
                    events.push(Event::ScheduleSetActive {
                        id: unchanged.id.clone(),
                        active: spec.active,
                    });
                }
            }
            None => events.push(Event::ScheduleCreated { record: candidate }),
        }
    }
    for orphan in &existing {
        if !kept.iter().any(|k| k.id == orphan.id) {
            events.push(Event::ScheduleRemoved {
                id: orphan.id.clone(),
            });
        }
    }
    events
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
