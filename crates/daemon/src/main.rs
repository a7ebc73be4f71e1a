// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! relayd: the Relay flow execution daemon.
//!
//! One process owns the whole engine: durable store, queue dispatcher,
//! worker pool, cron scheduler, and log sink. An advisory file lock
//! enforces the single-scheduler-per-deployment rule.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod ingest;
mod lifecycle;

use lifecycle::LifecycleError;
use tracing_subscriber::EnvFilter;

fn init_tracing(state_dir: &std::path::Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = state_dir.join("daemon-logs");
    std::fs::create_dir_all(&log_dir)?;
    let appender = tracing_appender::rolling::daily(&log_dir, "relayd.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

async fn run() -> Result<(), LifecycleError> {
    let state_dir = env::state_dir()?;
    let _guard = init_tracing(&state_dir)?;
    let _lock = lifecycle::acquire_lock(&state_dir)?;
    tracing::info!(state_dir = %state_dir.display(), "relayd starting");

    let engine = lifecycle::build_engine(&state_dir)?;
    engine.start();

    wait_for_signal().await;

    engine.shutdown().await;
    engine.store().compact()?;
    tracing::info!("relayd stopped");
    Ok(())
}

async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!(error = %e, "cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT received"),
        _ = term.recv() => tracing::info!("SIGTERM received"),
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("relayd: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
