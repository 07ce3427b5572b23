//! Gateway opcodes and wire-format messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_SUBSCRIBE: u8 = 2;
pub const OP_UNSUBSCRIBE: u8 = 3;
pub const OP_SUBSCRIBED: u8 = 4;
pub const OP_ERROR: u8 = 5;
pub const OP_HEARTBEAT_ACK: u8 = 6;
pub const OP_HELLO: u8 = 10;

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default)]
    pub d: Value,
}

impl GatewayMessage {
    /// Build a DISPATCH message (op=0).
    pub fn dispatch(topic: &str, event_name: &str, seq: u64, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event_name.to_string()),
            topic: Some(topic.to_string()),
            s: Some(seq),
            d: data,
        }
    }

    /// Build a HELLO message (op=10), the first frame of every connection.
    pub fn hello(connection_id: &str, heartbeat_interval_ms: u64) -> Self {
        Self::control(
            OP_HELLO,
            serde_json::json!({
                "connection_id": connection_id,
                "heartbeat_interval": heartbeat_interval_ms,
            }),
        )
    }

    /// Build a SUBSCRIBED acknowledgment (op=4). Events on `topic` dispatched
    /// after this frame are never missed.
    pub fn subscribed(topic: &str) -> Self {
        Self {
            topic: Some(topic.to_string()),
            ..Self::control(OP_SUBSCRIBED, serde_json::json!({ "topic": topic }))
        }
    }

    /// Build an ERROR message (op=5).
    pub fn error(message: &str) -> Self {
        Self::control(OP_ERROR, serde_json::json!({ "message": message }))
    }

    /// Build a HEARTBEAT_ACK message (op=6).
    pub fn heartbeat_ack(seq: u64) -> Self {
        Self::control(OP_HEARTBEAT_ACK, serde_json::json!({ "ack": seq }))
    }

    fn control(op: u8, d: Value) -> Self {
        Self {
            op,
            t: None,
            topic: None,
            s: None,
            d,
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

impl ClientMessage {
    pub fn heartbeat(seq: u64) -> Self {
        Self {
            op: OP_HEARTBEAT,
            d: serde_json::json!({ "seq": seq }),
        }
    }

    pub fn subscribe(topic: &str) -> Self {
        Self {
            op: OP_SUBSCRIBE,
            d: serde_json::json!({ "topic": topic }),
        }
    }

    pub fn unsubscribe(topic: &str) -> Self {
        Self {
            op: OP_UNSUBSCRIBE,
            d: serde_json::json!({ "topic": topic }),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    #[serde(default)]
    pub seq: u64,
}

/// Payload of SUBSCRIBE, UNSUBSCRIBE and SUBSCRIBED.
#[derive(Debug, Deserialize)]
pub struct TopicPayload {
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelloPayload {
    pub connection_id: String,
    pub heartbeat_interval: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_carries_topic_and_name() {
        let msg = GatewayMessage::dispatch("room-room_1", "message", 3, serde_json::json!({"text": "hi"}));
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["op"], 0);
        assert_eq!(json["t"], "message");
        assert_eq!(json["topic"], "room-room_1");
        assert_eq!(json["s"], 3);
        assert_eq!(json["d"]["text"], "hi");
    }

    #[test]
    fn control_frames_omit_dispatch_fields() {
        let json = serde_json::to_value(GatewayMessage::heartbeat_ack(7)).unwrap();
        assert_eq!(json, serde_json::json!({"op": 6, "d": {"ack": 7}}));

        let json = serde_json::to_value(GatewayMessage::subscribed("matchmaking")).unwrap();
        assert_eq!(json["op"], 4);
        assert_eq!(json["topic"], "matchmaking");
        assert_eq!(json["d"]["topic"], "matchmaking");
    }

    #[test]
    fn client_subscribe_round_trips_through_the_payload_type() {
        let msg = ClientMessage::subscribe("matchmaking");
        let raw = serde_json::to_string(&msg).unwrap();
        let parsed: ClientMessage = serde_json::from_str(&raw).unwrap();

        assert_eq!(parsed.op, OP_SUBSCRIBE);
        let payload: TopicPayload = serde_json::from_value(parsed.d).unwrap();
        assert_eq!(payload.topic, "matchmaking");
    }
}
