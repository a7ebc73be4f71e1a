// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue event handlers.

use super::MaterializedState;
use relay_core::Event;

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::QueueEnqueued { item } => {
            state.last_queue_seq = state.last_queue_seq.max(item.seq);
            state.queue.entry(item.seq).or_insert_with(|| item.clone());
        }

        Event::QueueClaimed { seq, worker, at_ms } => {
            if let Some(item) = state.queue.get_mut(seq) {
                if item.claimed_by.is_none() {
                    item.claimed_by = Some(worker.clone());
                    item.claimed_at_ms = Some(*at_ms);
                }
            }
        }

        Event::QueueReleased { seq } => {
            if let Some(item) = state.queue.get_mut(seq) {
                item.claimed_by = None;
                item.claimed_at_ms = None;
            }
        }

        Event::QueueRemoved { seq } => {
            state.queue.remove(seq);
        }

        _ => {}
    }
}
