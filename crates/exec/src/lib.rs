// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! relay-exec: pluggable executors and remote transports.
//!
//! The executor registry maps executor names to factories and config
//! schemas; the transport registry maps protocol names to node-client
//! factories. Built-ins: the `script` and `container` executors and the
//! `ssh` transport (CLI-driven).

pub mod executor;
pub mod registry;
pub mod sink;
pub mod subprocess;
pub mod transport;

pub use executor::{
    ExecContext, Executor, ExecutorError, ExecutorSpawn, RemoteHandle, OUTPUT_VAR,
};
pub use registry::ExecutorRegistry;
pub use sink::{LineSink, MemorySink, NullSink, StreamKind};
pub use transport::{NodeSpec, Transport, TransportError, TransportRegistry, TunnelStream};

#[cfg(any(test, feature = "test-support"))]
pub use transport::fake::FakeTransport;
