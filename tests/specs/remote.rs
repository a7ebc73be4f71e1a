// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote execution scenario: node-targeted script over a transport.

use super::helpers::{await_status, enqueue, ingest, outputs_of, rig_with};
use relay_core::ExecStatus;
use relay_exec::{FakeTransport, NodeSpec, TransportRegistry};
use std::sync::Arc;

fn node(name: &str) -> NodeSpec {
    NodeSpec {
        name: name.to_string(),
        namespace: String::new(),
        protocol: "ssh".to_string(),
        host: format!("{name}.internal"),
        user: Some("deploy".to_string()),
        port: None,
        identity_file: None,
    }
}

/// Registry whose `ssh` protocol hands out a shared fake transport
/// (filesystem-backed, so the full wrap/upload/run/download/cleanup
/// path executes without an sshd).
fn fake_ssh(transport: Arc<FakeTransport>) -> TransportRegistry {
    let mut registry = TransportRegistry::new();
    registry.register("ssh", move |_node| Ok(Arc::clone(&transport) as _));
    registry
}

#[tokio::test]
async fn remote_script_round_trips_output_and_cleans_up() {
    let transport = Arc::new(FakeTransport::new());
    let rig = rig_with(fake_ssh(Arc::clone(&transport)), vec![node("web-1")]);
    ingest(
        &rig,
        r#"
metadata: {id: remote-run, name: Remote Run}
actions:
  - id: probe
    executor: script
    node: web-1
    with:
      script: |
        echo ok > marker.txt
        echo K=v > "$OUTPUT"
"#,
    );
    enqueue(&rig, "remote-run", &[]);

    let exec_id = await_status(&rig, ExecStatus::Completed).await;

    // OUTPUT was downloaded and parsed.
    let outputs = outputs_of(&rig, &exec_id);
    assert_eq!(outputs["probe"].get("K").map(String::as_str), Some("v"));

    // The script ran in the remote scratch dir and its temp copy was
    // removed afterwards.
    let calls = transport.calls();
    assert!(calls.iter().any(|c| c.starts_with("upload")));
    assert!(calls.iter().any(|c| c.starts_with("download")));
    assert!(calls.iter().any(|c| c == "close"));
    let upload_path = calls
        .iter()
        .find(|c| c.starts_with("upload: "))
        .and_then(|c| c.strip_prefix("upload: "))
        .expect("upload recorded")
        .to_string();
    let scratch = std::path::Path::new(&upload_path)
        .parent()
        .expect("scratch dir");
    assert!(!std::path::Path::new(&upload_path).exists(), "temp script removed");
    assert!(scratch.join("marker.txt").exists(), "script ran remotely");

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn transport_failure_marks_the_execution_transport_errored() {
    // Real ssh against an unresolvable host: BatchMode fails fast and
    // the failure is classified as a transport error.
    let rig = rig_with(
        TransportRegistry::with_defaults(),
        vec![NodeSpec {
            name: "ghost".to_string(),
            namespace: String::new(),
            protocol: "ssh".to_string(),
            host: "relay-test-invalid.invalid".to_string(),
            user: None,
            port: None,
            identity_file: None,
        }],
    );
    ingest(
        &rig,
        r#"
metadata: {id: unreachable, name: Unreachable}
actions:
  - id: probe
    executor: script
    node: ghost
    with: {script: "true"}
"#,
    );
    enqueue(&rig, "unreachable", &[]);

    let exec_id = await_status(&rig, ExecStatus::Errored).await;
    let exec = rig.engine.execution(&exec_id).expect("row exists");
    assert_eq!(exec.error_kind, Some(relay_core::ErrorKind::Transport));

    rig.engine.shutdown().await;
}
