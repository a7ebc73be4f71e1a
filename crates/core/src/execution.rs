// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution row and its status state machine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Opaque external identifier for one run of a flow.
    ///
    /// Created when a worker claims a queue item; survives approval
    /// suspension and re-enqueue, so the same ID may be processed by
    /// several workers over its lifetime.
    pub struct ExecId("exec-");
}

/// What caused an execution to be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Manual,
    Api,
    Cron,
    Rerun,
}

crate::simple_display! {
    TriggerKind {
        Manual => "manual",
        Api => "api",
        Cron => "cron",
        Rerun => "rerun",
    }
}

/// Execution status. Transitions are a strict monotone walk:
/// `pending → running → (awaiting-approval → running)* → terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    Pending,
    Running,
    AwaitingApproval,
    Completed,
    Errored,
    Cancelled,
}

crate::simple_display! {
    ExecStatus {
        Pending => "pending",
        Running => "running",
        AwaitingApproval => "awaiting-approval",
        Completed => "completed",
        Errored => "errored",
        Cancelled => "cancelled",
    }
}

impl ExecStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecStatus::Completed | ExecStatus::Errored | ExecStatus::Cancelled
        )
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// Self-transitions are rejected; the walk never revisits a status
    /// except `running`, which is re-entered after approval.
    pub fn can_transition_to(&self, next: ExecStatus) -> bool {
        use ExecStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Pending, Errored)
                | (Running, AwaitingApproval)
                | (Running, Completed)
                | (Running, Errored)
                | (Running, Cancelled)
                | (AwaitingApproval, Running)
                | (AwaitingApproval, Cancelled)
                | (AwaitingApproval, Errored)
        )
    }
}

/// Classification of a persisted execution error.
///
/// This is the audit taxonomy, not an error type: the engine's error
/// enums carry the detail, and the terminal row records which bucket the
/// failure fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Flow document or inputs rejected before a row existed.
    Validation,
    /// Template reference did not resolve.
    Resolver,
    /// Secret lookup failed (distinct from resolver for audit).
    SecretUnavailable,
    /// Remote connect or transfer failed.
    Transport,
    /// Executor exited non-zero or crashed.
    Executor,
    /// Terminal by user or shutdown; not an error for metrics purposes.
    Cancelled,
    /// Worker died mid-run; detected at next boot.
    WorkerAbandoned,
    /// Unexpected invariant violation.
    Internal,
}

crate::simple_display! {
    ErrorKind {
        Validation => "validation",
        Resolver => "resolver",
        SecretUnavailable => "secret-unavailable",
        Transport => "transport",
        Executor => "executor",
        Cancelled => "cancelled",
        WorkerAbandoned => "worker-abandoned",
        Internal => "internal",
    }
}

/// Outcome of one action within an execution (for action history).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Running,
    Completed,
    Failed(String),
    AwaitingApproval,
}

/// Record of one action's run (action history on the execution row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action id from the flow definition.
    pub action_id: String,
    pub started_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    pub outcome: ActionOutcome,
}

/// One run of a flow with a concrete input map.
///
/// The row is created when a worker claims the queue item and is updated
/// in place as the action runner advances. `cursor` is the index of the
/// next action to run; approval suspension persists the cursor so a
/// different worker can resume after the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecId,
    pub namespace: String,
    pub flow_slug: String,
    /// Checksum of the flow snapshot this execution runs against.
    /// Later edits to the flow do not alter in-flight executions.
    pub snapshot: String,
    pub inputs: HashMap<String, String>,
    /// Captured OUTPUT env maps, keyed by action id.
    #[serde(default)]
    pub outputs: HashMap<String, HashMap<String, String>>,
    pub trigger: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at_ms: Option<u64>,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    pub status: ExecStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Index of the next action to run.
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

impl Execution {
    /// Record that an action started, pushing a history record.
    pub fn start_action(&mut self, action_id: &str, epoch_ms: u64) {
        self.actions.push(ActionRecord {
            action_id: action_id.to_string(),
            started_at_ms: epoch_ms,
            finished_at_ms: None,
            outcome: ActionOutcome::Running,
        });
    }

    /// Finalize the most recent history record for `action_id`.
    ///
    /// Guarded by `finished_at_ms` so replaying the same event twice is a
    /// no-op.
    pub fn finish_action(&mut self, action_id: &str, outcome: ActionOutcome, epoch_ms: u64) {
        if let Some(record) = self
            .actions
            .iter_mut()
            .rev()
            .find(|r| r.action_id == action_id)
        {
            if record.finished_at_ms.is_none() {
                record.finished_at_ms = Some(epoch_ms);
                record.outcome = outcome;
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

crate::builder! {
    pub struct ExecutionBuilder => Execution {
        into {
            id: ExecId = ExecId::from_string("exec-test0000000000000"),
            namespace: String = "",
            flow_slug: String = "test-flow",
            snapshot: String = "testchecksum",
        }
        set {
            inputs: HashMap<String, String> = HashMap::new(),
            outputs: HashMap<String, HashMap<String, String>> = HashMap::new(),
            trigger: TriggerKind = TriggerKind::Manual,
            started_at_ms: u64 = 1_000_000,
            status: ExecStatus = ExecStatus::Pending,
            cursor: usize = 0,
            actions: Vec<ActionRecord> = Vec::new(),
        }
        option {
            triggered_by: String = None,
            scheduled_at_ms: u64 = None,
            completed_at_ms: u64 = None,
            error: String = None,
            error_kind: ErrorKind = None,
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
