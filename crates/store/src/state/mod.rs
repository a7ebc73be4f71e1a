// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.

mod approvals;
mod executions;
mod flows;
mod queue;

use relay_core::{
    ApprovalRequest, Event, Execution, FlowRecord, FlowSnapshot, QueueItem, ScheduleRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Materialized state built from WAL replay.
///
/// Every map is keyed by the row's natural identity; the queue is a
/// `BTreeMap` so sweep claims drain in enqueue order. All event handlers
/// are idempotent (see `relay_core::event`): the same event is applied
/// once live and again on every replay.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    /// Flow catalog rows, keyed by `namespace/slug`.
    pub flows: HashMap<String, FlowRecord>,
    /// Immutable flow source snapshots, keyed by checksum.
    pub snapshots: HashMap<String, FlowSnapshot>,
    /// Cron schedule rows, keyed by schedule id.
    pub schedules: HashMap<String, ScheduleRecord>,
    /// Pending queue rows, keyed by monotonic seq.
    pub queue: BTreeMap<u64, QueueItem>,
    /// Highest queue seq ever issued (claims and deletions never lower it).
    pub last_queue_seq: u64,
    /// Execution rows, keyed by exec id.
    pub executions: HashMap<String, Execution>,
    /// Approval rows, keyed by approval id.
    pub approvals: HashMap<String, ApprovalRequest>,
}

impl MaterializedState {
    /// Apply an event to derive state changes.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::FlowIngested { .. }
            | Event::ScheduleCreated { .. }
            | Event::ScheduleRemoved { .. }
            | Event::ScheduleSetActive { .. } => flows::apply(self, event),

            Event::QueueEnqueued { .. }
            | Event::QueueClaimed { .. }
            | Event::QueueReleased { .. }
            | Event::QueueRemoved { .. } => queue::apply(self, event),

            Event::ExecCreated { .. }
            | Event::ExecStatusChanged { .. }
            | Event::ActionStarted { .. }
            | Event::ActionFinished { .. } => executions::apply(self, event),

            Event::ApprovalRequested { .. } | Event::ApprovalDecided { .. } => {
                approvals::apply(self, event)
            }
        }
    }

    /// Pending (unclaimed) queue rows in enqueue order.
    pub fn pending_queue(&self) -> impl Iterator<Item = &QueueItem> {
        self.queue.values().filter(|item| !item.is_claimed())
    }

    /// The single pending approval for (execution, action), if any.
    pub fn pending_approval_for(&self, exec_id: &str, action_id: &str) -> Option<&ApprovalRequest> {
        self.approvals.values().find(|a| {
            a.exec_id.as_str() == exec_id
                && a.action_id == action_id
                && !a.is_decided()
        })
    }

    /// System schedules currently attached to a flow.
    pub fn system_schedules_for(&self, namespace: &str, slug: &str) -> Vec<&ScheduleRecord> {
        self.schedules
            .values()
            .filter(|s| s.system && s.namespace == namespace && s.flow_slug == slug)
            .collect()
    }
}

#[cfg(test)]
#[path = "../state_tests.rs"]
mod tests;
