//! Event payloads published on the matchmaking and room topics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::room::Room;

/// Membership change announced on a room topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SystemEventType {
    Joined,
    Left,
}

impl SystemEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemEventType::Joined => "joined",
            SystemEventType::Left => "left",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "joined" => Some(SystemEventType::Joined),
            "left" => Some(SystemEventType::Left),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEventKind {
    Message { text: String },
    System { event_type: SystemEventType },
}

/// An ephemeral event relayed to the two parties of a room. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Originating party; absent for pure system broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(flatten)]
    pub kind: ChatEventKind,
}

impl ChatEvent {
    /// Dispatch name on the room topic.
    pub const MESSAGE: &'static str = "message";
    pub const SYSTEM: &'static str = "system_event";

    pub fn message(session_token: &str, text: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_event_id(),
            timestamp,
            session_token: Some(session_token.to_string()),
            kind: ChatEventKind::Message {
                text: text.trim().to_string(),
            },
        }
    }

    pub fn system(session_token: &str, event_type: SystemEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: new_event_id(),
            timestamp,
            session_token: Some(session_token.to_string()),
            kind: ChatEventKind::System { event_type },
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self.kind {
            ChatEventKind::Message { .. } => Self::MESSAGE,
            ChatEventKind::System { .. } => Self::SYSTEM,
        }
    }

    pub fn is_from(&self, session_token: &str) -> bool {
        self.session_token.as_deref() == Some(session_token)
    }

    pub fn system_event_type(&self) -> Option<SystemEventType> {
        match self.kind {
            ChatEventKind::System { event_type } => Some(event_type),
            ChatEventKind::Message { .. } => None,
        }
    }
}

fn new_event_id() -> String {
    duet_common::id::prefixed_ulid(duet_common::id::prefix::EVENT)
}

/// Broadcast on the matchmaking topic after a successful pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoomCreated {
    pub room_id: String,
    /// The two paired session tokens, earliest waiter first.
    pub users: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl RoomCreated {
    pub const EVENT_NAME: &'static str = "room_created";

    pub fn includes(&self, session_token: &str) -> bool {
        self.users.iter().any(|u| u == session_token)
    }
}

impl From<&Room> for RoomCreated {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.id.clone(),
            users: vec![room.party_a.clone(), room.party_b.clone()],
            expires_at: room.expires_at,
        }
    }
}
