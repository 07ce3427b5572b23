//! Broadcast hub for dispatching events to connected gateway sessions.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each connection subscribes
//! and filters events locally by the topics it asked for.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use super::topic::Topic;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// At-least-once fan-out of named JSON events to every current subscriber
/// of a topic.
///
/// Publishes issued one after another by the same caller are delivered in
/// that order; nothing is promised across callers.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &Topic, event_name: &str, data: Value) -> Result<(), PublishError>;
}

/// Serialize `event` and publish it.
pub async fn publish_event<T: Serialize + Sync>(
    publisher: &dyn EventPublisher,
    topic: &Topic,
    event_name: &str,
    event: &T,
) -> Result<(), PublishError> {
    let data = serde_json::to_value(event)?;
    publisher.publish(topic, event_name, data).await
}

/// A payload broadcast to all connected gateway sessions.
#[derive(Debug, Clone)]
pub struct BroadcastPayload {
    pub topic: Topic,
    /// The dispatch event name (e.g. "room_created").
    pub event_name: String,
    pub data: Value,
}

/// The in-process broadcast hub. Store in AppState.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Arc<BroadcastPayload>>,
}

impl EventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Each gateway connection calls this once to get its own receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastPayload>> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for EventHub {
    async fn publish(&self, topic: &Topic, event_name: &str, data: Value) -> Result<(), PublishError> {
        let payload = BroadcastPayload {
            topic: topic.clone(),
            event_name: event_name.to_string(),
            data,
        };
        // send() returns Err if there are no receivers; nobody is listening.
        if self.sender.send(Arc::new(payload)).is_err() {
            tracing::debug!(%topic, event_name, "published with no connected receivers");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receivers_see_publishes_in_order() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        let topic = Topic::room("room_1");

        hub.publish(&topic, "system_event", serde_json::json!({"n": 1})).await.unwrap();
        hub.publish(&topic, "message", serde_json::json!({"n": 2})).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_name, "system_event");
        assert_eq!(second.event_name, "message");
        assert_eq!(second.topic, topic);
    }

    #[tokio::test]
    async fn publishing_without_receivers_is_not_an_error() {
        let hub = EventHub::new();
        hub.publish(&Topic::Matchmaking, "room_created", Value::Null).await.unwrap();
        assert_eq!(hub.receiver_count(), 0);
    }
}
