// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: single-instance lock, tracing, wiring, drain.

use crate::env;
use crate::ingest;
use fs2::FileExt;
use relay_core::{StaticSecrets, SystemClock};
use relay_engine::{AllowAll, Engine, EngineConfig};
use relay_exec::{ExecutorRegistry, NodeSpec, TransportRegistry};
use relay_store::Store;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine a state directory (set RELAY_STATE_DIR)")]
    NoStateDir,
    #[error("another relayd instance holds the lock at {0}")]
    AlreadyRunning(String),
    #[error(transparent)]
    Engine(#[from] relay_engine::EngineError),
    #[error(transparent)]
    Store(#[from] relay_store::StoreError),
    #[error("daemon io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid nodes file: {0}")]
    Nodes(String),
}

/// Held for the daemon's lifetime; the scheduler loop must have exactly
/// one owner per deployment.
pub struct InstanceLock {
    _file: File,
}

pub fn acquire_lock(state_dir: &Path) -> Result<InstanceLock, LifecycleError> {
    std::fs::create_dir_all(state_dir)?;
    let path = state_dir.join("relayd.lock");
    let file = File::create(&path)?;
    file.try_lock_exclusive()
        .map_err(|_| LifecycleError::AlreadyRunning(path.display().to_string()))?;
    Ok(InstanceLock { _file: file })
}

/// Load target nodes from the optional JSON nodes file.
pub fn load_nodes(path: &Path) -> Result<Vec<NodeSpec>, LifecycleError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| LifecycleError::Nodes(e.to_string()))
}

/// Open the store, wire the registries, ingest the flow directory, and
/// return a ready (unstarted) engine.
pub fn build_engine(state_dir: &Path) -> Result<Arc<Engine<SystemClock>>, LifecycleError> {
    let store = Arc::new(Store::open(&state_dir.join("store"), SystemClock)?);
    let nodes = load_nodes(&env::nodes_file(state_dir))?;

    let config = EngineConfig {
        workers: env::workers().unwrap_or_else(|| EngineConfig::default().workers),
        sweep_interval: env::sweep_interval(),
        resync_interval: env::resync_interval(),
        drain_timeout: env::drain_timeout(),
        work_root: state_dir.join("work"),
        log_root: state_dir.join("logs"),
        log_retention: env::log_retention(),
        log_max_bytes: env::log_max_bytes(),
        nodes,
        ..EngineConfig::default()
    };

    let engine = Arc::new(Engine::new(
        store,
        Arc::new(ExecutorRegistry::with_defaults()),
        Arc::new(TransportRegistry::with_defaults()),
        Arc::new(StaticSecrets::new()),
        Arc::new(AllowAll),
        config,
    )?);

    let flow_dir = env::flow_dir(state_dir);
    let report = ingest::ingest_dir(&engine, &env::namespace(), &flow_dir)?;
    tracing::info!(
        dir = %flow_dir.display(),
        ingested = report.ingested,
        skipped = report.skipped,
        "flow catalog loaded"
    );

    Ok(engine)
}
