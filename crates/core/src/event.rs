// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable event log entries.
//!
//! Every store mutation is expressed as one of these events, appended to
//! the WAL and applied to the materialized state. Serializes with
//! `{"type": "domain:verb", ...fields}` format.
//!
//! # Idempotency Requirement
//!
//! **All state handlers for these events MUST be idempotent.** The same
//! event is applied once when the mutation happens and again on every
//! WAL replay after restart, so applying it twice must produce the same
//! state as applying it once. Handlers guard inserts with existence
//! checks and guard transitions with status checks.

use crate::approval::{ApprovalId, ApprovalRequest, ApprovalStatus};
use crate::catalog::{FlowRecord, FlowSnapshot, ScheduleId, ScheduleRecord};
use crate::execution::{ActionOutcome, ErrorKind, ExecId, ExecStatus, Execution};
use crate::queue::QueueItem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Events that mutate durable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- flow catalog --
    #[serde(rename = "flow:ingested")]
    FlowIngested {
        record: FlowRecord,
        snapshot: FlowSnapshot,
    },

    // -- schedules --
    #[serde(rename = "schedule:created")]
    ScheduleCreated { record: ScheduleRecord },

    #[serde(rename = "schedule:removed")]
    ScheduleRemoved { id: ScheduleId },

    #[serde(rename = "schedule:set-active")]
    ScheduleSetActive { id: ScheduleId, active: bool },

    // -- queue --
    #[serde(rename = "queue:enqueued")]
    QueueEnqueued { item: QueueItem },

    #[serde(rename = "queue:claimed")]
    QueueClaimed {
        seq: u64,
        worker: String,
        at_ms: u64,
    },

    /// Claim released without running (claimant died before the
    /// execution row existed). The row becomes claimable again.
    #[serde(rename = "queue:released")]
    QueueReleased { seq: u64 },

    #[serde(rename = "queue:removed")]
    QueueRemoved { seq: u64 },

    // -- executions --
    #[serde(rename = "exec:created")]
    ExecCreated { execution: Execution },

    #[serde(rename = "exec:status-changed")]
    ExecStatusChanged {
        id: ExecId,
        status: ExecStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_kind: Option<ErrorKind>,
        at_ms: u64,
    },

    #[serde(rename = "exec:action-started")]
    ActionStarted {
        exec_id: ExecId,
        action_id: String,
        index: usize,
        at_ms: u64,
    },

    #[serde(rename = "exec:action-finished")]
    ActionFinished {
        exec_id: ExecId,
        action_id: String,
        index: usize,
        outcome: ActionOutcome,
        /// Parsed OUTPUT env map captured from the action.
        #[serde(default)]
        outputs: HashMap<String, String>,
        at_ms: u64,
    },

    // -- approvals --
    #[serde(rename = "approval:requested")]
    ApprovalRequested { request: ApprovalRequest },

    #[serde(rename = "approval:decided")]
    ApprovalDecided {
        id: ApprovalId,
        status: ApprovalStatus,
        decided_by: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        at_ms: u64,
    },
}

impl Event {
    /// Short name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Event::FlowIngested { .. } => "flow:ingested",
            Event::ScheduleCreated { .. } => "schedule:created",
            Event::ScheduleRemoved { .. } => "schedule:removed",
            Event::ScheduleSetActive { .. } => "schedule:set-active",
            Event::QueueEnqueued { .. } => "queue:enqueued",
            Event::QueueClaimed { .. } => "queue:claimed",
            Event::QueueReleased { .. } => "queue:released",
            Event::QueueRemoved { .. } => "queue:removed",
            Event::ExecCreated { .. } => "exec:created",
            Event::ExecStatusChanged { .. } => "exec:status-changed",
            Event::ActionStarted { .. } => "exec:action-started",
            Event::ActionFinished { .. } => "exec:action-finished",
            Event::ApprovalRequested { .. } => "approval:requested",
            Event::ApprovalDecided { .. } => "approval:decided",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
