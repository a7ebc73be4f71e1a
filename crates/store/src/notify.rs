// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification fan-out.
//!
//! Named broadcast channels with fire-and-forget delivery. Payloads are
//! small strings (the `new_flow` channel carries the decimal queue seq).
//! Delivery is best-effort: a subscriber that lags or disconnects misses
//! messages, and the dispatcher's periodic sweep is the recovery path.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Channel announcing newly inserted queue rows.
pub const NEW_FLOW_CHANNEL: &str = "new_flow";

const CHANNEL_CAPACITY: usize = 256;

/// Process-wide named notification channels.
#[derive(Default)]
pub struct Notifier {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a named channel, creating it on first use.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.sender(channel).subscribe()
    }

    /// Publish a payload. Subscriber absence is not an error.
    pub fn notify(&self, channel: &str, payload: impl Into<String>) {
        let payload = payload.into();
        let sender = self.sender(channel);
        match sender.send(payload) {
            Ok(receivers) => {
                tracing::trace!(channel, receivers, "notified");
            }
            Err(_) => {
                tracing::trace!(channel, "notify with no subscribers");
            }
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}
