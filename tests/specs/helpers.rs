// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for engine scenarios.

use relay_core::{ApprovalRequest, ExecId, ExecStatus, FakeClock, StaticSecrets, TriggerKind};
use relay_engine::{AllowAll, Engine, EngineConfig};
use relay_exec::{ExecutorRegistry, NodeSpec, TransportRegistry};
use relay_store::Store;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestRig {
    pub engine: Arc<Engine<FakeClock>>,
    _dir: TempDir,
}

pub fn rig() -> TestRig {
    rig_with(TransportRegistry::with_defaults(), Vec::new())
}

/// Build and start an engine against temp dirs, with custom transports
/// and nodes (for remote scenarios).
pub fn rig_with(transports: TransportRegistry, nodes: Vec<NodeSpec>) -> TestRig {
    let dir = TempDir::new().expect("tempdir");
    let store = Arc::new(
        Store::open(&dir.path().join("store"), FakeClock::new()).expect("store opens"),
    );
    let config = EngineConfig {
        workers: 2,
        sweep_interval: Duration::from_millis(100),
        work_root: dir.path().join("work"),
        log_root: dir.path().join("logs"),
        remote_work_root: dir.path().join("remote").display().to_string(),
        nodes,
        ..EngineConfig::default()
    };
    let engine = Arc::new(
        Engine::new(
            store,
            Arc::new(ExecutorRegistry::with_defaults()),
            Arc::new(transports),
            Arc::new(StaticSecrets::new()),
            Arc::new(AllowAll),
            config,
        )
        .expect("engine builds"),
    );
    engine.start();
    TestRig { engine, _dir: dir }
}

pub fn ingest(rig: &TestRig, yaml: &str) {
    rig.engine
        .ingest_source("", Path::new("/flows/spec.yaml"), yaml)
        .expect("flow ingests");
}

pub fn enqueue(rig: &TestRig, slug: &str, inputs: &[(&str, &str)]) {
    rig.engine
        .enqueue(
            "",
            slug,
            inputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            TriggerKind::Api,
            Some("spec-tests"),
        )
        .expect("enqueue succeeds");
}

/// Poll until the single execution reaches `status` (or panic).
pub async fn await_status(rig: &TestRig, status: ExecStatus) -> ExecId {
    for _ in 0..500 {
        let found = rig.engine.store().read(|s| {
            s.executions
                .values()
                .find(|e| e.status == status)
                .map(|e| e.id.clone())
        });
        if let Some(id) = found {
            return id;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let statuses = rig
        .engine
        .store()
        .read(|s| s.executions.values().map(|e| e.status).collect::<Vec<_>>());
    panic!("no execution reached {status}; have {statuses:?}");
}

/// Poll until a pending approval row exists.
pub async fn await_pending_approval(rig: &TestRig) -> ApprovalRequest {
    for _ in 0..500 {
        let found = rig
            .engine
            .store()
            .read(|s| s.approvals.values().find(|a| !a.is_decided()).cloned());
        if let Some(approval) = found {
            return approval;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no pending approval appeared");
}

pub fn outputs_of(rig: &TestRig, id: &ExecId) -> HashMap<String, HashMap<String, String>> {
    rig.engine
        .execution(id)
        .map(|e| e.outputs)
        .unwrap_or_default()
}
