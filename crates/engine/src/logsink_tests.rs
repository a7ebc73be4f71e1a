// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn sink(dir: &TempDir) -> LogSink {
    LogSink::new(&dir.path().join("logs"), 1024).unwrap()
}

#[test]
fn writes_append_in_order() {
    let dir = TempDir::new().unwrap();
    let logs = sink(&dir);
    let writer = logs.writer("exec-a").unwrap();

    writer.line(StreamKind::Stdout, "first");
    writer.line(StreamKind::Stderr, "second");
    writer.line(StreamKind::Stdout, "third");

    assert_eq!(logs.read("exec-a").unwrap(), "first\nsecond\nthird\n");
}

#[test]
fn streams_are_isolated_per_execution() {
    let dir = TempDir::new().unwrap();
    let logs = sink(&dir);
    logs.writer("exec-a").unwrap().line(StreamKind::Stdout, "a");
    logs.writer("exec-b").unwrap().line(StreamKind::Stdout, "b");

    assert_eq!(logs.read("exec-a").unwrap(), "a\n");
    assert_eq!(logs.read("exec-b").unwrap(), "b\n");
}

#[test]
fn live_subscribers_receive_new_lines() {
    let dir = TempDir::new().unwrap();
    let logs = sink(&dir);
    let mut rx = logs.subscribe("exec-a");
    let writer = logs.writer("exec-a").unwrap();

    writer.line(StreamKind::Stdout, "hello");
    assert_eq!(rx.try_recv().unwrap(), "hello");
}

#[test]
fn finish_closes_live_channels() {
    let dir = TempDir::new().unwrap();
    let logs = sink(&dir);
    let writer = logs.writer("exec-a").unwrap();
    let mut rx = logs.subscribe("exec-a");

    writer.line(StreamKind::Stdout, "tail");
    logs.finish("exec-a");
    // EOF arrives once the sink's channel and the writer are both gone.
    drop(writer);

    assert_eq!(rx.try_recv().unwrap(), "tail");
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Closed)
    ));
    // History remains readable after the live channel closes.
    assert_eq!(logs.read("exec-a").unwrap(), "tail\n");
}

#[test]
fn size_cap_drops_excess_lines() {
    let dir = TempDir::new().unwrap();
    let logs = LogSink::new(&dir.path().join("logs"), 12).unwrap();
    let writer = logs.writer("exec-a").unwrap();

    writer.line(StreamKind::Stdout, "0123456789"); // 11 bytes with newline
    writer.line(StreamKind::Stdout, "overflow");

    assert_eq!(logs.read("exec-a").unwrap(), "0123456789\n");
}

#[test]
fn sweep_prunes_old_logs_only() {
    let dir = TempDir::new().unwrap();
    let logs = sink(&dir);
    logs.writer("exec-old").unwrap().line(StreamKind::Stdout, "x");
    logs.writer("exec-new").unwrap().line(StreamKind::Stdout, "y");

    // Everything is newer than a day: nothing pruned.
    assert_eq!(logs.sweep(std::time::Duration::from_secs(86_400)).unwrap(), 0);
    // Zero retention prunes them all.
    assert_eq!(logs.sweep(std::time::Duration::ZERO).unwrap(), 2);
    assert!(logs.read("exec-old").is_err());
}
