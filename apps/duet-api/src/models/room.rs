use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::rooms;
use crate::models::queue_entry::QueueEntry;

/// A time-boxed session between exactly two visitors.
///
/// Rooms are never updated after the pairing transaction creates them. The
/// only state change is expiry, which is derived from `expires_at` at read
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Room {
    pub id: String,
    pub party_a: String,
    pub party_b: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Room {
    pub fn is_alive(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_participant(&self, session_token: &str) -> bool {
        self.party_a == session_token || self.party_b == session_token
    }

    /// Whole seconds until expiry, clamped at zero.
    pub fn seconds_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    pub fn parties(&self) -> [&str; 2] {
        [&self.party_a, &self.party_b]
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rooms)]
pub struct NewRoom {
    pub id: String,
    pub party_a: String,
    pub party_b: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewRoom {
    /// Draft the room that pairs two queue entries, `first` being the earlier.
    pub fn pair(first: &QueueEntry, second: &QueueEntry, now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            id: duet_common::id::prefixed_ulid(duet_common::id::prefix::ROOM),
            party_a: first.session_token.clone(),
            party_b: second.session_token.clone(),
            created_at: now,
            expires_at: now + duration,
        }
    }
}

impl From<NewRoom> for Room {
    fn from(room: NewRoom) -> Self {
        Self {
            id: room.id,
            party_a: room.party_a,
            party_b: room.party_b,
            created_at: room.created_at,
            expires_at: room.expires_at,
        }
    }
}
