//! Per-connection gateway session state.

use std::collections::HashSet;

use super::topic::Topic;

/// State for a single WebSocket connection. Owned by its event loop.
pub struct GatewaySession {
    /// Unique connection identifier (`gw_` prefixed ULID).
    pub connection_id: String,
    topics: HashSet<Topic>,
    /// Last sequence number handed out for a dispatch.
    seq: u64,
}

impl GatewaySession {
    pub fn new(connection_id: String) -> Self {
        Self {
            connection_id,
            topics: HashSet::new(),
            seq: 0,
        }
    }

    /// Returns false if the topic was already subscribed.
    pub fn subscribe(&mut self, topic: Topic) -> bool {
        self.topics.insert(topic)
    }

    pub fn unsubscribe(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic)
    }

    pub fn is_subscribed(&self, topic: &Topic) -> bool {
        self.topics.contains(topic)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Get the next sequence number for a dispatch event.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}
