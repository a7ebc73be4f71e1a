// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow catalog and schedule event handlers.

use super::MaterializedState;
use relay_core::{scoped_name, Event};

pub(super) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::FlowIngested { record, snapshot } => {
            state
                .snapshots
                .entry(snapshot.checksum.clone())
                .or_insert_with(|| snapshot.clone());
            state.flows.insert(
                scoped_name(&record.namespace, &record.slug),
                record.clone(),
            );
        }

        Event::ScheduleCreated { record } => {
            state
                .schedules
                .insert(record.id.as_str().to_string(), record.clone());
        }

        Event::ScheduleRemoved { id } => {
            state.schedules.remove(id.as_str());
        }

        Event::ScheduleSetActive { id, active } => {
            if let Some(schedule) = state.schedules.get_mut(id.as_str()) {
                schedule.active = *active;
            }
        }

        _ => {}
    }
}
