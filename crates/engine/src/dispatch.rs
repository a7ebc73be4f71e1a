// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue dispatch: notification listener + periodic sweep.
//!
//! The listener claims exactly the row named by each `new_flow` payload;
//! the sweep claims pending backlog in batches. Both paths converge on
//! the same bounded intake channel feeding the worker pool. Notify is
//! authoritative for freshness; the sweep is the safety net that covers
//! missed notifications and listener reconnect windows.

use crate::engine::Engine;
use relay_core::{Clock, QueueItem};
use relay_store::{StoreError, NEW_FLOW_CHANNEL};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

const RECONNECT_INITIAL: Duration = Duration::from_millis(100);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

pub(crate) async fn dispatch_loop<C: Clock + 'static>(
    engine: Arc<Engine<C>>,
    tx: mpsc::Sender<QueueItem>,
) {
    let mut reconnect_delay = RECONNECT_INITIAL;
    'session: loop {
        if engine.shutdown.is_cancelled() {
            return;
        }
        let mut rx = engine.store().notifier().subscribe(NEW_FLOW_CHANNEL);
        // A fresh subscription may have missed notifications; drain the
        // backlog immediately rather than waiting a sweep period.
        sweep_once(&engine, &tx).await;

        let mut sweep = tokio::time::interval(engine.config.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        sweep.reset();

        loop {
            tokio::select! {
                _ = engine.shutdown.cancelled() => return,
                message = rx.recv() => match message {
                    Ok(payload) => handle_notify(&engine, &tx, &payload).await,
                    Err(RecvError::Lagged(missed)) => {
                        // A notify firehose can outrun us; the rows are
                        // still pending, so sweep them through.
                        tracing::warn!(missed, "notification listener lagged");
                        sweep_once(&engine, &tx).await;
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!(
                            delay_ms = reconnect_delay.as_millis() as u64,
                            "notification channel lost; reconnecting"
                        );
                        tokio::select! {
                            _ = engine.shutdown.cancelled() => return,
                            _ = tokio::time::sleep(reconnect_delay) => {}
                        }
                        reconnect_delay = (reconnect_delay * 2).min(RECONNECT_MAX);
                        continue 'session;
                    }
                },
                _ = sweep.tick() => sweep_once(&engine, &tx).await,
            }
            reconnect_delay = RECONNECT_INITIAL;
        }
    }
}

/// Claim the single row a notification names.
async fn handle_notify<C: Clock + 'static>(
    engine: &Arc<Engine<C>>,
    tx: &mpsc::Sender<QueueItem>,
    payload: &str,
) {
    let Ok(seq) = payload.parse::<u64>() else {
        tracing::warn!(payload, "unparseable notification payload");
        return;
    };
    let started = std::time::Instant::now();
    match engine.store().claim(seq, "listener") {
        Ok(item) => {
            let claim_ms = started.elapsed().as_millis() as u64;
            tracing::debug!(seq, claim_ms, "claimed via notification");
            if tx.send(item).await.is_err() {
                tracing::warn!(seq, "intake channel closed");
            }
        }
        // Already consumed (sweep won, or an earlier listener pass did);
        // the claim is atomic so the collision is benign.
        Err(StoreError::QueueItemGone(_)) | Err(StoreError::AlreadyClaimed { .. }) => {
            tracing::trace!(seq, "notification for already-claimed row");
        }
        Err(e) => {
            tracing::warn!(seq, error = %e, "claim failed; row left for sweep");
        }
    }
}

/// Claim up to a worker-pool's worth of pending rows.
async fn sweep_once<C: Clock + 'static>(engine: &Arc<Engine<C>>, tx: &mpsc::Sender<QueueItem>) {
    let depth = engine.store().pending_count();
    match engine.store().claim_pending(engine.config.workers, "sweep") {
        Ok(items) => {
            if !items.is_empty() {
                tracing::debug!(claimed = items.len(), depth, "sweep claimed backlog");
            }
            for item in items {
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "sweep claim failed"),
    }
}
