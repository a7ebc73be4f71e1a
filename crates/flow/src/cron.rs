// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expression and timezone handling.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CronError {
    #[error("invalid cron expression '{expression}': {message}")]
    Expression { expression: String, message: String },
    #[error("unknown timezone: {0}")]
    Timezone(String),
}

/// Parse a cron expression.
///
/// Schedules use the classic five-field form (minute hour day-of-month
/// month day-of-week); a seconds field of `0` is prepended before
/// handing the expression to the parser, which expects six fields.
pub fn parse_expression(expression: &str) -> Result<Schedule, CronError> {
    let normalized = normalize(expression);
    Schedule::from_str(&normalized).map_err(|e| CronError::Expression {
        expression: expression.to_string(),
        message: e.to_string(),
    })
}

fn normalize(expression: &str) -> String {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        format!("0 {}", expression.trim())
    } else {
        expression.trim().to_string()
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, CronError> {
    name.parse::<Tz>()
        .map_err(|_| CronError::Timezone(name.to_string()))
}

/// Compute the next fire time strictly after `after`, in UTC.
///
/// The expression is evaluated in the schedule's declared timezone. A
/// fire time in the past is never returned, which is what makes missed
/// fires disappear instead of backfilling: the scheduler always asks
/// from "now".
pub fn next_fire_after(
    schedule: &Schedule,
    tz: Tz,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
