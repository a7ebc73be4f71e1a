// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution event handlers.

use super::MaterializedState;
use relay_core::Event;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::ExecCreated { execution } => {
            state
                .executions
                .entry(execution.id.as_str().to_string())
                .or_insert_with(|| execution.clone());
        }

        Event::ExecStatusChanged {
            id,
            status,
            error,
            error_kind,
            at_ms,
        } => {
            if let Some(exec) = state.executions.get_mut(id.as_str()) {
                // Transition guard doubles as the idempotency guard:
                // replaying the same event finds the status already set
                // and the walk disallows self-transitions.
                if exec.status.can_transition_to(*status) {
                    exec.status = *status;
                    if let Some(error) = error {
                        exec.error = Some(error.clone());
                    }
                    if let Some(kind) = error_kind {
                        exec.error_kind = Some(*kind);
                    }
                    if status.is_terminal() {
                        exec.completed_at_ms = Some(*at_ms);
                    }
                }
            }
        }

        Event::ActionStarted {
            exec_id,
            action_id,
            index,
            at_ms,
        } => {
            if let Some(exec) = state.executions.get_mut(exec_id.as_str()) {
                // Skip if replay already recorded this attempt.
                let already = exec
                    .actions
                    .last()
                    .map(|r| r.action_id == *action_id && r.finished_at_ms.is_none())
                    .unwrap_or(false);
                if !already {
                    exec.start_action(action_id, *at_ms);
                }
                exec.cursor = *index;
            }
        }

        Event::ActionFinished {
            exec_id,
            action_id,
            index,
            outcome,
            outputs,
            at_ms,
        } => {
            if let Some(exec) = state.executions.get_mut(exec_id.as_str()) {
                exec.finish_action(action_id, outcome.clone(), *at_ms);
                if !outputs.is_empty() {
                    exec.outputs.insert(action_id.clone(), outputs.clone());
                }
                if matches!(outcome, relay_core::ActionOutcome::Completed) {
                    exec.cursor = index + 1;
                }
            }
        }

        _ => {}
    }
}
