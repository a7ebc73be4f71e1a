// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue row.

use crate::execution::{ExecId, TriggerKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A durable pending intent to start (or resume) an execution.
///
/// `seq` is monotonic within one store and is the payload of the
/// `new_flow` notification. A row is claimed at most once: claiming is an
/// atomic update that fails on rows whose `claimed_by` is already set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub seq: u64,
    /// Opaque external identity for the enqueue request.
    pub uuid: String,
    pub namespace: String,
    pub flow_slug: String,
    /// Flow snapshot checksum captured at enqueue time.
    pub snapshot: String,
    pub inputs: HashMap<String, String>,
    pub trigger: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    /// Set for cron-triggered rows: the fire time that produced them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at_ms: Option<u64>,
    /// Present when this row resumes a suspended execution instead of
    /// starting a fresh one (approval grants re-enqueue with the same id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_exec: Option<ExecId>,
    pub enqueued_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
}

impl QueueItem {
    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }
}

crate::builder! {
    pub struct QueueItemBuilder => QueueItem {
        into {
            uuid: String = "00000000-0000-0000-0000-000000000000",
            namespace: String = "",
            flow_slug: String = "test-flow",
            snapshot: String = "testchecksum",
        }
        set {
            seq: u64 = 1,
            inputs: HashMap<String, String> = HashMap::new(),
            trigger: TriggerKind = TriggerKind::Manual,
            enqueued_at_ms: u64 = 1_000_000,
        }
        option {
            triggered_by: String = None,
            scheduled_at_ms: u64 = None,
            resume_exec: ExecId = None,
            claimed_at_ms: u64 = None,
            claimed_by: String = None,
        }
    }
}
