// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval event handlers.

use super::MaterializedState;
use relay_core::{ApprovalStatus, Event};

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ApprovalRequested { request } => {
            state
                .approvals
                .entry(request.id.as_str().to_string())
                .or_insert_with(|| request.clone());
        }

        Event::ApprovalDecided {
            id,
            status,
            decided_by,
            note,
            at_ms,
        } => {
            if let Some(approval) = state.approvals.get_mut(id.as_str()) {
                if approval.status == ApprovalStatus::Pending {
                    approval.status = *status;
                    approval.decided_by = Some(decided_by.clone());
                    approval.note = note.clone();
                    approval.decided_at_ms = Some(*at_ms);
                }
            }
        }

        _ => {}
    }
}
