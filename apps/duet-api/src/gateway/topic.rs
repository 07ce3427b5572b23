use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MATCHMAKING: &str = "matchmaking";
const ROOM_PREFIX: &str = "room-";

/// A named broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Global topic carrying `room_created`.
    Matchmaking,
    /// Per-room topic carrying `message` and `system_event`.
    Room(String),
}

impl Topic {
    pub fn room(room_id: impl Into<String>) -> Self {
        Topic::Room(room_id.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Matchmaking => f.write_str(MATCHMAKING),
            Topic::Room(id) => write!(f, "{ROOM_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown topic {0:?}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == MATCHMAKING {
            return Ok(Topic::Matchmaking);
        }
        match s.strip_prefix(ROOM_PREFIX) {
            Some(id) if !id.is_empty() => Ok(Topic::Room(id.to_string())),
            _ => Err(UnknownTopic(s.to_string())),
        }
    }
}
