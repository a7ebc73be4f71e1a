// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval request records.

use crate::execution::ExecId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a pending human decision on a gated action.
    pub struct ApprovalId("appr-");
}

/// Decision state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

crate::simple_display! {
    ApprovalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// A human-gated suspension point inside an execution.
///
/// At most one pending request exists per (execution, action); a second
/// decision on an already-decided request is a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub exec_id: ExecId,
    pub action_id: String,
    pub namespace: String,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at_ms: Option<u64>,
}

impl ApprovalRequest {
    pub fn is_decided(&self) -> bool {
        self.status != ApprovalStatus::Pending
    }
}

crate::builder! {
    pub struct ApprovalRequestBuilder => ApprovalRequest {
        into {
            id: ApprovalId = ApprovalId::from_string("appr-test0000000000000"),
            exec_id: ExecId = ExecId::from_string("exec-test0000000000000"),
            action_id: String = "gate",
            namespace: String = "",
        }
        set {
            status: ApprovalStatus = ApprovalStatus::Pending,
            created_at_ms: u64 = 1_000_000,
        }
        option {
            decided_by: String = None,
            note: String = None,
            decided_at_ms: u64 = None,
        }
    }
}
