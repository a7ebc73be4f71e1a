// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool.
//!
//! N workers share one bounded intake channel; admission is first-come,
//! first-served with no priority and no per-flow serialization. Each
//! worker hydrates the claimed item's flow snapshot, drives the action
//! runner, and picks up the next item. Execution failures never take a
//! worker down.

use crate::engine::Engine;
use relay_core::{Clock, ErrorKind, ExecStatus, QueueItem};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) async fn worker_loop<C: Clock + 'static>(
    engine: Arc<Engine<C>>,
    index: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<QueueItem>>>,
) {
    let worker = format!("worker-{index}");
    loop {
        // One waiter holds the receiver at a time; the lock releases as
        // soon as an item (or close) is observed.
        let item = tokio::select! {
            _ = engine.shutdown.cancelled() => return,
            item = async { rx.lock().await.recv().await } => item,
        };
        let Some(item) = item else {
            return;
        };
        run_item(&engine, &worker, item).await;
    }
}

async fn run_item<C: Clock + 'static>(engine: &Arc<Engine<C>>, worker: &str, item: QueueItem) {
    let seq = item.seq;
    let exec = match engine.store().start_execution(&item) {
        Ok(exec) => exec,
        Err(e) => {
            tracing::warn!(worker, seq, error = %e, "could not start execution");
            return;
        }
    };
    if exec.status != ExecStatus::Running {
        // Stale resume row (execution cancelled while suspended).
        tracing::debug!(worker, seq, exec_id = %exec.id, "skipping non-runnable item");
        return;
    }

    let flow = match engine.hydrate(&exec.snapshot) {
        Ok(flow) => flow,
        Err(e) => {
            tracing::error!(worker, exec_id = %exec.id, error = %e, "flow snapshot hydration failed");
            crate::runner::finish(
                engine,
                &exec.id,
                ExecStatus::Errored,
                e.to_string(),
                Some(ErrorKind::Internal),
            );
            return;
        }
    };

    // Worker shutdown and user cancel share this token.
    let cancel = engine.shutdown.child_token();
    engine
        .running
        .lock()
        .insert(exec.id.as_str().to_string(), cancel.clone());

    tracing::info!(worker, seq, exec_id = %exec.id, flow = %exec.flow_slug, cursor = exec.cursor, "worker picked up execution");
    let exec_id = exec.id.clone();
    crate::runner::run_execution(engine, &flow, exec, cancel).await;
    engine.running.lock().remove(exec_id.as_str());
}
