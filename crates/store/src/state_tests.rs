// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::{
    ActionOutcome, ApprovalRequest, ApprovalStatus, ErrorKind, Event, ExecId, ExecStatus,
    Execution, QueueItem,
};
use std::collections::HashMap;

fn exec_event() -> (ExecId, Event) {
    let execution = Execution::builder().build();
    (
        execution.id.clone(),
        Event::ExecCreated { execution },
    )
}

#[test]
fn queue_enqueue_claim_remove_lifecycle() {
    let mut state = MaterializedState::default();
    let item = QueueItem::builder().seq(1).build();
    state.apply_event(&Event::QueueEnqueued { item });
    assert_eq!(state.last_queue_seq, 1);
    assert_eq!(state.pending_queue().count(), 1);

    state.apply_event(&Event::QueueClaimed {
        seq: 1,
        worker: "w0".to_string(),
        at_ms: 5,
    });
    assert_eq!(state.pending_queue().count(), 0);
    assert_eq!(
        state.queue[&1].claimed_by.as_deref(),
        Some("w0")
    );

    state.apply_event(&Event::QueueRemoved { seq: 1 });
    assert!(state.queue.is_empty());
    // Seq stays monotonic after removal.
    assert_eq!(state.last_queue_seq, 1);
}

#[test]
fn claim_is_first_writer_wins_on_replay() {
    let mut state = MaterializedState::default();
    state.apply_event(&Event::QueueEnqueued {
        item: QueueItem::builder().seq(1).build(),
    });
    state.apply_event(&Event::QueueClaimed {
        seq: 1,
        worker: "w0".to_string(),
        at_ms: 5,
    });
    state.apply_event(&Event::QueueClaimed {
        seq: 1,
        worker: "w1".to_string(),
        at_ms: 6,
    });
    assert_eq!(state.queue[&1].claimed_by.as_deref(), Some("w0"));
    assert_eq!(state.queue[&1].claimed_at_ms, Some(5));
}

#[test]
fn queue_released_clears_claim() {
    let mut state = MaterializedState::default();
    state.apply_event(&Event::QueueEnqueued {
        item: QueueItem::builder().seq(1).build(),
    });
    state.apply_event(&Event::QueueClaimed {
        seq: 1,
        worker: "w0".to_string(),
        at_ms: 5,
    });
    state.apply_event(&Event::QueueReleased { seq: 1 });
    assert_eq!(state.pending_queue().count(), 1);
}

#[test]
fn status_never_regresses() {
    let mut state = MaterializedState::default();
    let (id, created) = exec_event();
    state.apply_event(&created);
    for (status, expected) in [
        (ExecStatus::Running, ExecStatus::Running),
        (ExecStatus::Completed, ExecStatus::Completed),
        // Terminal: further transitions are ignored.
        (ExecStatus::Running, ExecStatus::Completed),
        (ExecStatus::Cancelled, ExecStatus::Completed),
    ] {
        state.apply_event(&Event::ExecStatusChanged {
            id: id.clone(),
            status,
            error: None,
            error_kind: None,
            at_ms: 1,
        });
        assert_eq!(state.executions[id.as_str()].status, expected);
    }
}

#[test]
fn terminal_status_records_completion_time() {
    let mut state = MaterializedState::default();
    let (id, created) = exec_event();
    state.apply_event(&created);
    state.apply_event(&Event::ExecStatusChanged {
        id: id.clone(),
        status: ExecStatus::Running,
        error: None,
        error_kind: None,
        at_ms: 1,
    });
    state.apply_event(&Event::ExecStatusChanged {
        id: id.clone(),
        status: ExecStatus::Errored,
        error: Some("boom".to_string()),
        error_kind: Some(ErrorKind::Executor),
        at_ms: 9,
    });
    let exec = &state.executions[id.as_str()];
    assert_eq!(exec.completed_at_ms, Some(9));
    assert_eq!(exec.error.as_deref(), Some("boom"));
    assert_eq!(exec.error_kind, Some(ErrorKind::Executor));
}

#[test]
fn exec_created_is_idempotent() {
    let mut state = MaterializedState::default();
    let (id, created) = exec_event();
    state.apply_event(&created);
    state.apply_event(&Event::ExecStatusChanged {
        id: id.clone(),
        status: ExecStatus::Running,
        error: None,
        error_kind: None,
        at_ms: 1,
    });
    // Replayed create must not clobber progress.
    state.apply_event(&created);
    assert_eq!(state.executions[id.as_str()].status, ExecStatus::Running);
}

#[test]
fn action_events_update_cursor_and_outputs() {
    let mut state = MaterializedState::default();
    let (id, created) = exec_event();
    state.apply_event(&created);
    state.apply_event(&Event::ActionStarted {
        exec_id: id.clone(),
        action_id: "fetch".to_string(),
        index: 0,
        at_ms: 1,
    });
    assert_eq!(state.executions[id.as_str()].cursor, 0);

    let outputs = HashMap::from([("TOKEN".to_string(), "abc".to_string())]);
    state.apply_event(&Event::ActionFinished {
        exec_id: id.clone(),
        action_id: "fetch".to_string(),
        index: 0,
        outcome: ActionOutcome::Completed,
        outputs,
        at_ms: 2,
    });
    let exec = &state.executions[id.as_str()];
    assert_eq!(exec.cursor, 1);
    assert_eq!(exec.outputs["fetch"]["TOKEN"], "abc");
    assert_eq!(exec.actions.len(), 1);
    assert_eq!(exec.actions[0].outcome, ActionOutcome::Completed);
}

#[test]
fn action_started_replay_does_not_duplicate_records() {
    let mut state = MaterializedState::default();
    let (id, created) = exec_event();
    state.apply_event(&created);
    let started = Event::ActionStarted {
        exec_id: id.clone(),
        action_id: "fetch".to_string(),
        index: 0,
        at_ms: 1,
    };
    state.apply_event(&started);
    state.apply_event(&started);
    assert_eq!(state.executions[id.as_str()].actions.len(), 1);
}

#[test]
fn failed_action_does_not_advance_cursor() {
    let mut state = MaterializedState::default();
    let (id, created) = exec_event();
    state.apply_event(&created);
    state.apply_event(&Event::ActionStarted {
        exec_id: id.clone(),
        action_id: "fetch".to_string(),
        index: 0,
        at_ms: 1,
    });
    state.apply_event(&Event::ActionFinished {
        exec_id: id.clone(),
        action_id: "fetch".to_string(),
        index: 0,
        outcome: ActionOutcome::Failed("exit 1".to_string()),
        outputs: HashMap::new(),
        at_ms: 2,
    });
    assert_eq!(state.executions[id.as_str()].cursor, 0);
}

#[test]
fn approval_decided_is_idempotent_and_first_wins() {
    let mut state = MaterializedState::default();
    let request = ApprovalRequest::builder().build();
    let id = request.id.clone();
    state.apply_event(&Event::ApprovalRequested { request });
    state.apply_event(&Event::ApprovalDecided {
        id: id.clone(),
        status: ApprovalStatus::Approved,
        decided_by: "amara".to_string(),
        note: None,
        at_ms: 5,
    });
    state.apply_event(&Event::ApprovalDecided {
        id: id.clone(),
        status: ApprovalStatus::Rejected,
        decided_by: "kai".to_string(),
        note: Some("late".to_string()),
        at_ms: 6,
    });
    let approval = &state.approvals[id.as_str()];
    assert_eq!(approval.status, ApprovalStatus::Approved);
    assert_eq!(approval.decided_by.as_deref(), Some("amara"));
}

#[test]
fn pending_approval_lookup_ignores_decided_rows() {
    let mut state = MaterializedState::default();
    let request = ApprovalRequest::builder().build();
    let id = request.id.clone();
    let exec_id = request.exec_id.clone();
    state.apply_event(&Event::ApprovalRequested {
        request: request.clone(),
    });
    assert!(state
        .pending_approval_for(exec_id.as_str(), &request.action_id)
        .is_some());

    state.apply_event(&Event::ApprovalDecided {
        id,
        status: ApprovalStatus::Approved,
        decided_by: "amara".to_string(),
        note: None,
        at_ms: 5,
    });
    assert!(state
        .pending_approval_for(exec_id.as_str(), &request.action_id)
        .is_none());
}
