// src/pubsub.rs

//! Minimal publish/subscribe recorder.
//!
//! `publish` appends to a per-channel queue and nothing is delivered; tests read
//! the queue back with `get_messages`. Blocking `SUBSCRIBE`/`PSUBSCRIBE` are
//! refused by the engine.

use std::collections::BTreeMap;

use tracing::debug;

#[derive(Debug, Default)]
pub struct PubSub {
    channels: BTreeMap<String, Vec<String>>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` on `channel`. Returns the number of receivers, which
    /// is always 0 since there are no live subscribers.
    pub fn publish(&mut self, channel: &str, message: &str) -> usize {
        let queue = self.channels.entry(channel.to_string()).or_default();
        queue.push(message.to_string());
        debug!(channel, queued = queue.len(), "message published");
        0
    }

    /// Everything published on `channel` so far, oldest first.
    pub fn get_messages(&self, channel: &str) -> &[String] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Channels that have received at least one message.
    pub fn channels(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}
