// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron scheduler.
//!
//! A single-owner loop (one instance per deployment). Every resync
//! interval it re-reads the active schedules and arms the next fire per
//! schedule, computed in the schedule's declared timezone. Fires enqueue
//! with trigger=cron and the schedule's stored inputs. Arming is always
//! strictly future-of-now, so fires missed during downtime vanish
//! instead of backfilling, and disabled or deleted schedules drop out at
//! the next resync.

use crate::engine::Engine;
use chrono::{DateTime, Utc};
use relay_core::{Clock, ScheduleRecord, TriggerKind};
use std::sync::Arc;
use std::time::Duration;

/// One schedule with its armed fire time.
struct Armed {
    record: ScheduleRecord,
    next: DateTime<Utc>,
}

/// Pure fire-time bookkeeping, separated from the loop for testability.
pub(crate) struct Planner {
    armed: Vec<Armed>,
}

impl Planner {
    /// Arm every schedule's next fire strictly after `now`. Unparseable
    /// rows are skipped with a warning (they were validated at ingest;
    /// user schedules are validated at creation).
    pub(crate) fn resync(schedules: Vec<ScheduleRecord>, now: DateTime<Utc>) -> Self {
        let armed = schedules
            .into_iter()
            .filter_map(|record| match arm(&record, now) {
                Some(next) => Some(Armed { record, next }),
                None => None,
            })
            .collect();
        Self { armed }
    }

    /// Earliest armed fire, if any.
    pub(crate) fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.armed.iter().map(|a| a.next).min()
    }

    /// Schedules due at `now`, each re-armed strictly after `now`.
    /// Re-arming after *now* (not after the fire) is what collapses a
    /// backlog of missed fires into zero: only the future remains.
    pub(crate) fn take_due(&mut self, now: DateTime<Utc>) -> Vec<(ScheduleRecord, DateTime<Utc>)> {
        let mut due = Vec::new();
        for armed in &mut self.armed {
            if armed.next <= now {
                due.push((armed.record.clone(), armed.next));
                if let Some(next) = arm(&armed.record, now) {
                    armed.next = next;
                }
            }
        }
        // A schedule with no future occurrence cannot re-arm; drop it
        // until the next resync instead of firing it repeatedly.
        self.armed.retain(|a| a.next > now);
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.armed.len()
    }
}

fn arm(record: &ScheduleRecord, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let schedule = match relay_flow::parse_expression(&record.expression) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(schedule = %record.id, error = %e, "skipping unparseable cron expression");
            return None;
        }
    };
    let tz = match relay_flow::parse_timezone(&record.timezone) {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!(schedule = %record.id, error = %e, "skipping unknown timezone");
            return None;
        }
    };
    relay_flow::next_fire_after(&schedule, tz, after)
}

pub(crate) async fn scheduler_loop<C: Clock + 'static>(engine: Arc<Engine<C>>) {
    loop {
        if engine.shutdown.is_cancelled() {
            return;
        }
        let now = engine.store().clock().now_utc();
        let mut planner = Planner::resync(engine.store().active_schedules(), now);
        tracing::debug!(armed = planner.len(), "cron resync");

        let resync_deadline = tokio::time::Instant::now() + engine.config.resync_interval;
        loop {
            let now = engine.store().clock().now_utc();
            for (record, fired_at) in planner.take_due(now) {
                fire(&engine, &record, fired_at);
            }

            let until_deadline = resync_deadline.saturating_duration_since(tokio::time::Instant::now());
            if until_deadline.is_zero() {
                break;
            }
            let sleep_for = match planner.next_fire() {
                Some(next) => {
                    let until_fire = (next - now).to_std().unwrap_or(Duration::ZERO);
                    until_fire.min(until_deadline)
                }
                None => until_deadline,
            };
            tokio::select! {
                _ = engine.shutdown.cancelled() => return,
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }
}

fn fire<C: Clock + 'static>(engine: &Arc<Engine<C>>, record: &ScheduleRecord, fired_at: DateTime<Utc>) {
    tracing::info!(
        schedule = %record.id,
        flow = %record.flow_slug,
        fired_at = %fired_at,
        "cron fired"
    );
    let result = engine.enqueue_at(
        &record.namespace,
        &record.flow_slug,
        record.inputs.clone(),
        TriggerKind::Cron,
        record.created_by.as_deref(),
        Some(fired_at.timestamp_millis() as u64),
    );
    if let Err(e) = result {
        tracing::warn!(schedule = %record.id, error = %e, "cron enqueue failed");
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
