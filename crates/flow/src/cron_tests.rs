// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};

#[test]
fn parses_five_field_expression() {
    assert!(parse_expression("* * * * *").is_ok());
    assert!(parse_expression("*/5 0 * * 1-5").is_ok());
}

#[test]
fn rejects_garbage_expression() {
    assert!(parse_expression("not a cron").is_err());
    assert!(parse_expression("99 * * * *").is_err());
}

#[test]
fn parses_known_timezones() {
    assert!(parse_timezone("UTC").is_ok());
    assert!(parse_timezone("America/New_York").is_ok());
    assert!(parse_timezone("Europe/Berlin").is_ok());
}

#[test]
fn rejects_unknown_timezone() {
    assert!(parse_timezone("Mars/Olympus_Mons").is_err());
}

#[test]
fn next_fire_is_strictly_in_the_future() {
    let schedule = parse_expression("* * * * *").unwrap();
    let tz = parse_timezone("UTC").unwrap();
    // Exactly on a minute boundary: the same minute must not fire again.
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 5, 0).unwrap();
    let next = next_fire_after(&schedule, tz, at).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 12, 6, 0).unwrap());
}

#[test]
fn missed_fires_are_not_backfilled() {
    let schedule = parse_expression("0 12 * * *").unwrap();
    let tz = parse_timezone("UTC").unwrap();
    // Asking from two days after a fire yields the next future fire,
    // never the two that were slept through.
    let late = Utc.with_ymd_and_hms(2026, 3, 3, 13, 0, 0).unwrap();
    let next = next_fire_after(&schedule, tz, late).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap());
}

#[test]
fn fire_time_respects_declared_timezone() {
    let schedule = parse_expression("0 9 * * *").unwrap();
    let tz = parse_timezone("America/New_York").unwrap();
    // 9am New York in winter is 14:00 UTC.
    let at = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
    let next = next_fire_after(&schedule, tz, at).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap());
}

#[test]
fn consecutive_fires_are_totally_ordered() {
    let schedule = parse_expression("*/15 * * * *").unwrap();
    let tz = parse_timezone("UTC").unwrap();
    let mut at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
    let mut fires = Vec::new();
    for _ in 0..4 {
        let next = next_fire_after(&schedule, tz, at).unwrap();
        fires.push(next);
        at = next;
    }
    assert_eq!(fires[0].to_rfc3339(), "2026-06-01T00:15:00+00:00");
    assert_eq!(fires[3].to_rfc3339(), "2026-06-01T01:00:00+00:00");
}
