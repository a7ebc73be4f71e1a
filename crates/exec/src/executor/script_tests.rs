// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sink::MemorySink;
use crate::transport::fake::FakeTransport;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn local_executor(dir: &TempDir) -> ScriptExecutor {
    ScriptExecutor::new(ExecutorSpawn {
        action: "greet".to_string(),
        work_dir: dir.path().join("work"),
        remote: None,
    })
}

fn context(with: serde_json::Value, variables: &[(&str, &str)]) -> (ExecContext, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (
        ExecContext {
            variables: variables
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            with,
            sink: sink.clone(),
        },
        sink,
    )
}

#[tokio::test]
async fn runs_script_and_parses_output_env() {
    let dir = TempDir::new().unwrap();
    let executor = local_executor(&dir);
    let (ctx, _) = context(
        json!({"script": "echo TOKEN=abc > \"$OUTPUT\"\necho COUNT=2 >> \"$OUTPUT\""}),
        &[],
    );

    let outputs = executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap();

    assert_eq!(outputs.get("TOKEN").map(String::as_str), Some("abc"));
    assert_eq!(outputs.get("COUNT").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn exports_variables_as_env_vars() {
    let dir = TempDir::new().unwrap();
    let executor = local_executor(&dir);
    let (ctx, sink) = context(json!({"script": "echo \"hello $who\""}), &[("who", "world")]);

    executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap();

    assert_eq!(sink.stdout(), vec!["hello world"]);
}

#[tokio::test]
async fn missing_output_file_yields_empty_env() {
    let dir = TempDir::new().unwrap();
    let executor = local_executor(&dir);
    let (ctx, sink) = context(json!({"script": "echo 'Hello, world' > /dev/null"}), &[]);

    let outputs = executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap();

    assert!(outputs.is_empty());
    assert!(sink.stdout().is_empty());
}

#[tokio::test]
async fn nonzero_exit_fails_with_code() {
    let dir = TempDir::new().unwrap();
    let executor = local_executor(&dir);
    let (ctx, _) = context(json!({"script": "exit 7"}), &[]);

    let err = executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Failed(7)));
}

#[tokio::test]
async fn rejects_config_without_script() {
    let dir = TempDir::new().unwrap();
    let executor = local_executor(&dir);
    let (ctx, _) = context(json!({"interpreter": "/bin/sh"}), &[]);

    let err = executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Config(_)));
}

#[tokio::test]
async fn local_push_and_pull_preserve_relative_paths() {
    let dir = TempDir::new().unwrap();
    let executor = local_executor(&dir);
    let cancel = CancellationToken::new();

    let source = dir.path().join("artifacts/data/in.txt");
    tokio::fs::create_dir_all(source.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(&source, "payload").await.unwrap();

    executor
        .push_file(&cancel, &source, "data/in.txt")
        .await
        .unwrap();
    assert_eq!(
        tokio::fs::read_to_string(dir.path().join("work/push/data/in.txt"))
            .await
            .unwrap(),
        "payload"
    );

    tokio::fs::create_dir_all(dir.path().join("work/pull"))
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("work/pull/result.txt"), "done")
        .await
        .unwrap();
    let collected = dir.path().join("artifacts/result.txt");
    executor
        .pull_file(&cancel, "result.txt", &collected)
        .await
        .unwrap();
    assert_eq!(tokio::fs::read_to_string(&collected).await.unwrap(), "done");
}

// =============================================================================
// remote execution (fake transport)
// =============================================================================

fn remote_executor(dir: &TempDir, transport: Arc<FakeTransport>) -> ScriptExecutor {
    ScriptExecutor::new(ExecutorSpawn {
        action: "greet".to_string(),
        work_dir: dir.path().join("work"),
        remote: Some(RemoteHandle {
            transport,
            remote_dir: dir.path().join("remote").display().to_string(),
        }),
    })
}

#[tokio::test]
async fn remote_script_uploads_runs_downloads_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(FakeTransport::new());
    let executor = remote_executor(&dir, transport.clone());
    let (ctx, _) = context(
        json!({"script": "echo ok > /tmp/relay-test-x; echo K=v > \"$OUTPUT\""}),
        &[],
    );

    let outputs = executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap();
    assert_eq!(outputs.get("K").map(String::as_str), Some("v"));

    let calls = transport.calls();
    assert!(calls.iter().any(|c| c.starts_with("upload")));
    assert!(calls.iter().any(|c| c.starts_with("download")));
    // The remote temp script is removed after the run.
    let remote_script = dir.path().join("remote/.greet.script");
    assert!(!remote_script.exists());
}

#[tokio::test]
async fn remote_variables_cross_the_transport() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(FakeTransport::new());
    let executor = remote_executor(&dir, transport);
    let (ctx, sink) = context(json!({"script": "echo \"got $x\""}), &[("x", "abc")]);

    executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap();
    assert_eq!(sink.stdout(), vec!["got abc"]);
}

#[tokio::test]
async fn remote_failure_still_removes_temp_script() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(FakeTransport::new());
    let executor = remote_executor(&dir, transport);
    let (ctx, _) = context(json!({"script": "exit 9"}), &[]);

    let err = executor
        .execute(&CancellationToken::new(), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutorError::Failed(9)));
    assert!(!dir.path().join("remote/.greet.script").exists());
}

#[tokio::test]
async fn close_releases_the_transport_idempotently() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(FakeTransport::new());
    let executor = remote_executor(&dir, transport.clone());

    executor.close().await;
    executor.close().await;
    assert!(transport.is_closed());
}
