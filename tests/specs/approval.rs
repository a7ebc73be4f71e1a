// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval gate scenarios: approve-and-resume, reject-and-cancel.

use super::helpers::{await_pending_approval, await_status, enqueue, ingest, outputs_of, rig};
use relay_core::{ApprovalStatus, ExecStatus};

const GATED: &str = r#"
metadata: {id: gated, name: Gated}
actions:
  - id: prepare
    executor: script
    with:
      script: 'echo STAGE=prepared > "$OUTPUT"'
  - id: gate
    executor: script
    approval: true
    with:
      script: 'echo STAGE=gated > "$OUTPUT"'
  - id: finish
    executor: script
    with:
      script: 'echo STAGE=finished > "$OUTPUT"'
"#;

#[tokio::test]
async fn approved_execution_resumes_and_completes() {
    let rig = rig();
    ingest(&rig, GATED);
    enqueue(&rig, "gated", &[]);

    let exec_id = await_status(&rig, ExecStatus::AwaitingApproval).await;
    let approval = await_pending_approval(&rig).await;
    assert_eq!(approval.exec_id, exec_id);
    assert_eq!(approval.action_id, "gate");

    rig.engine
        .decide(&approval.id, true, "amara", None)
        .expect("decision accepted");

    await_status(&rig, ExecStatus::Completed).await;

    // The gated action ran after approval and the rest followed.
    let outputs = outputs_of(&rig, &exec_id);
    assert_eq!(outputs["gate"].get("STAGE").map(String::as_str), Some("gated"));
    assert_eq!(
        outputs["finish"].get("STAGE").map(String::as_str),
        Some("finished")
    );

    let decided = rig.engine.store().approval(&approval.id).expect("row exists");
    assert_eq!(decided.status, ApprovalStatus::Approved);
    assert_eq!(decided.decided_by.as_deref(), Some("amara"));

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn rejected_execution_cancels_with_the_note() {
    let rig = rig();
    ingest(&rig, GATED);
    enqueue(&rig, "gated", &[]);

    await_status(&rig, ExecStatus::AwaitingApproval).await;
    let approval = await_pending_approval(&rig).await;

    rig.engine
        .decide(&approval.id, false, "amara", Some("nope".to_string()))
        .expect("decision accepted");

    let exec_id = await_status(&rig, ExecStatus::Cancelled).await;
    let exec = rig.engine.execution(&exec_id).expect("row exists");
    assert_eq!(exec.error.as_deref(), Some("nope"));

    // Neither the gated action nor anything after it executed.
    assert!(!exec.outputs.contains_key("gate"));
    assert!(!exec.outputs.contains_key("finish"));

    rig.engine.shutdown().await;
}

#[tokio::test]
async fn second_decision_conflicts() {
    let rig = rig();
    ingest(&rig, GATED);
    enqueue(&rig, "gated", &[]);

    await_status(&rig, ExecStatus::AwaitingApproval).await;
    let approval = await_pending_approval(&rig).await;

    rig.engine
        .decide(&approval.id, true, "amara", None)
        .expect("first decision lands");
    let err = rig
        .engine
        .decide(&approval.id, false, "kai", None)
        .expect_err("second decision must conflict");
    assert!(err.to_string().contains("already decided"));

    rig.engine.shutdown().await;
}
