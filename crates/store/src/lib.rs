// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-store: durable state for the flow execution engine.
//!
//! A write-ahead log of typed events, a materialized state replayed from
//! it, zstd snapshots for fast startup, and a notify hub for queue
//! fan-out. The [`Store`] wraps all of it behind transactional methods:
//! enqueue, atomic claim, execution bookkeeping, approval decisions, and
//! flow-catalog ingest.

pub mod notify;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod wal;

pub use notify::{Notifier, NEW_FLOW_CHANNEL};
pub use state::MaterializedState;
pub use store::{
    DecisionOutcome, EnqueueRequest, IngestOutcome, IngestRequest, Store, StoreError,
    SystemScheduleSpec,
};
pub use wal::{Entry, Wal, WalError};
