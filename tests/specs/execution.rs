// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic execution scenarios: hello world, output propagation, failure.

use super::helpers::{await_status, enqueue, ingest, outputs_of, rig};
use relay_core::ExecStatus;

#[tokio::test]
async fn hello_world_completes_with_redirected_output() {
    let rig = rig();
    ingest(
        &rig,
        r#"
metadata: {id: hello-world, name: Hello World}
inputs:
  - {name: USER, type: string, required: true}
actions:
  - id: greet
    executor: script
    with:
      interpreter: /bin/bash
      script: 'echo "Hello, $USER" > "$OUTPUT"'
"#,
    );
    enqueue(&rig, "hello-world", &[("USER", "world")]);

    let exec_id = await_status(&rig, ExecStatus::Completed).await;

    // Everything was redirected into OUTPUT, and "Hello, world" is not
    // a KEY=VALUE line, so no output keys and no stdout in the log.
    let outputs = outputs_of(&rig, &exec_id);
    assert!(outputs.get("greet").map(|m| m.is_empty()).unwrap_or(true));
    let log = rig.engine.logs().read(exec_id.as_str()).unwrap_or_default();
    assert_eq!(log, "");

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn outputs_propagate_to_later_actions() {
    let rig = rig();
    ingest(
        &rig,
        r#"
metadata: {id: propagate, name: Propagate}
actions:
  - id: produce
    executor: script
    with:
      script: 'echo TOKEN=abc > "$OUTPUT"'
  - id: consume
    executor: script
    variables:
      x: "{{ actions.produce.TOKEN }}"
    with:
      script: 'echo "$x"'
"#,
    );
    enqueue(&rig, "propagate", &[]);

    let exec_id = await_status(&rig, ExecStatus::Completed).await;

    let outputs = outputs_of(&rig, &exec_id);
    assert_eq!(
        outputs["produce"].get("TOKEN").map(String::as_str),
        Some("abc")
    );
    let log = rig.engine.logs().read(exec_id.as_str()).expect("log readable");
    assert!(log.contains("abc"), "consume's stdout should carry the token: {log:?}");

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn action_failure_stops_the_execution() {
    let rig = rig();
    ingest(
        &rig,
        r#"
metadata: {id: failing, name: Failing}
actions:
  - id: boom
    executor: script
    with: {script: "exit 2"}
  - id: never
    executor: script
    with: {script: "echo SHOULD_NOT=run > \"$OUTPUT\""}
"#,
    );
    enqueue(&rig, "failing", &[]);

    let exec_id = await_status(&rig, ExecStatus::Errored).await;
    let exec = rig.engine.execution(&exec_id).expect("row exists");

    assert_eq!(exec.error_kind, Some(relay_core::ErrorKind::Executor));
    assert!(!exec.outputs.contains_key("never"));
    assert!(!exec.actions.iter().any(|a| a.action_id == "never"));
    // The error text is surfaced on the log tail.
    let log = rig.engine.logs().read(exec_id.as_str()).expect("log readable");
    assert!(log.contains("error:"), "{log:?}");

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn rerun_starts_a_fresh_execution_with_the_same_inputs() {
    let rig = rig();
    ingest(
        &rig,
        r#"
metadata: {id: echoer, name: Echoer}
inputs:
  - {name: MSG, required: true}
actions:
  - id: say
    executor: script
    with:
      script: 'echo SAID=$MSG > "$OUTPUT"'
"#,
    );
    enqueue(&rig, "echoer", &[("MSG", "once")]);
    let first = await_status(&rig, ExecStatus::Completed).await;

    rig.engine.rerun(&first, "spec-tests").expect("rerun enqueues");

    for _ in 0..500 {
        let done = rig.engine.store().read(|s| {
            s.executions
                .values()
                .filter(|e| e.status == ExecStatus::Completed)
                .count()
        });
        if done == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let rerun = rig.engine.store().read(|s| {
        s.executions
            .values()
            .find(|e| e.id != first)
            .cloned()
            .expect("second execution exists")
    });
    assert_eq!(rerun.trigger, relay_core::TriggerKind::Rerun);
    assert_eq!(rerun.inputs.get("MSG").map(String::as_str), Some("once"));
    assert_eq!(rerun.status, ExecStatus::Completed);
    assert_eq!(
        rerun.outputs["say"].get("SAID").map(String::as_str),
        Some("once")
    );

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn artifacts_hand_off_between_actions() {
    let rig = rig();
    ingest(
        &rig,
        r#"
metadata: {id: artifacts, name: Artifacts}
actions:
  - id: produce
    executor: script
    artifacts:
      pull: [report/out.txt]
    with:
      script: |
        mkdir -p pull/report
        echo payload > pull/report/out.txt
  - id: consume
    executor: script
    artifacts:
      push: [report/out.txt]
    with:
      script: 'cat push/report/out.txt'
"#,
    );
    enqueue(&rig, "artifacts", &[]);

    let exec_id = await_status(&rig, ExecStatus::Completed).await;
    let log = rig.engine.logs().read(exec_id.as_str()).expect("log readable");
    assert!(log.contains("payload"), "pulled artifact should reach the next action: {log:?}");

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn later_duplicate_output_keys_win() {
    let rig = rig();
    ingest(
        &rig,
        r##"
metadata: {id: shadow, name: Shadow}
actions:
  - id: produce
    executor: script
    with:
      script: |
        echo K=first > "$OUTPUT"
        echo "# comment" >> "$OUTPUT"
        echo K=last >> "$OUTPUT"
"##,
    );
    enqueue(&rig, "shadow", &[]);

    let exec_id = await_status(&rig, ExecStatus::Completed).await;
    let outputs = outputs_of(&rig, &exec_id);
    assert_eq!(outputs["produce"].get("K").map(String::as_str), Some("last"));

    rig.engine.shutdown().await;
}
