// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output line sinks.
//!
//! Executors and transports stream child stdout/stderr line-by-line into
//! a sink; the engine's log sink implements this to feed the owning
//! execution's log stream.

use parking_lot::Mutex;

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

relay_core::simple_display! {
    StreamKind {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Line-buffered output consumer.
pub trait LineSink: Send + Sync {
    fn line(&self, stream: StreamKind, line: &str);
}

/// Sink that discards everything.
pub struct NullSink;

impl LineSink for NullSink {
    fn line(&self, _stream: StreamKind, _line: &str) {}
}

/// Sink that records lines in memory (tests and buffering).
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(StreamKind, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(StreamKind, String)> {
        self.lines.lock().clone()
    }

    pub fn stdout(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(k, _)| *k == StreamKind::Stdout)
            .map(|(_, l)| l.clone())
            .collect()
    }
}

impl LineSink for MemorySink {
    fn line(&self, stream: StreamKind, line: &str) {
        self.lines.lock().push((stream, line.to_string()));
    }
}
