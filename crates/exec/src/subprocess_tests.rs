// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sink::MemorySink;
use tokio::process::Command;

fn bash(script: &str) -> Command {
    let mut cmd = Command::new("/bin/bash");
    cmd.arg("-c").arg(script);
    cmd
}

#[tokio::test]
async fn streams_stdout_and_stderr_lines() {
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();
    let exit = run_streaming(
        bash("echo out1; echo err1 >&2; echo out2"),
        &cancel,
        sink.clone(),
        "test",
    )
    .await
    .unwrap();

    assert_eq!(exit, 0);
    assert_eq!(sink.stdout(), vec!["out1", "out2"]);
    let stderr: Vec<_> = sink
        .lines()
        .into_iter()
        .filter(|(k, _)| *k == StreamKind::Stderr)
        .map(|(_, l)| l)
        .collect();
    assert_eq!(stderr, vec!["err1"]);
}

#[tokio::test]
async fn reports_nonzero_exit_code() {
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();
    let exit = run_streaming(bash("exit 3"), &cancel, sink, "test")
        .await
        .unwrap();
    assert_eq!(exit, 3);
}

#[tokio::test]
async fn cancellation_kills_the_child() {
    let sink = Arc::new(MemorySink::new());
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let result = run_streaming(bash("echo early; sleep 30; echo late"), &cancel, sink.clone(), "test").await;

    assert!(matches!(result, Err(SubprocessError::Cancelled { .. })));
    assert!(started.elapsed() < std::time::Duration::from_secs(20));
    // Output emitted before the cancel is retained.
    assert_eq!(sink.stdout(), vec!["early"]);
}

#[tokio::test]
async fn run_with_timeout_captures_output() {
    let output = run_with_timeout(
        bash("printf hello"),
        std::time::Duration::from_secs(10),
        "test",
    )
    .await
    .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello");
}

#[tokio::test]
async fn run_with_timeout_reports_timeout() {
    let err = run_with_timeout(
        bash("sleep 30"),
        std::time::Duration::from_millis(100),
        "slowpoke",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SubprocessError::Timeout { .. }));
}

#[test]
fn shell_quote_wraps_and_escapes() {
    assert_eq!(shell_quote("plain"), "'plain'");
    assert_eq!(shell_quote("has space"), "'has space'");
    assert_eq!(shell_quote("it's"), "'it'\\''s'");
    assert_eq!(shell_quote("$HOME `pwd`"), "'$HOME `pwd`'");
}
