use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::room::Room;

use super::{MatchError, Matchmaker};

/// A room as seen by a client at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoomView {
    pub id: String,
    pub expires_at: DateTime<Utc>,
    pub seconds_left: i64,
    pub alive: bool,
}

impl RoomView {
    pub fn of(room: &Room, now: DateTime<Utc>) -> Self {
        Self {
            id: room.id.clone(),
            expires_at: room.expires_at,
            seconds_left: room.seconds_left(now),
            alive: room.is_alive(now),
        }
    }
}

impl Matchmaker {
    pub async fn get_room(&self, room_id: &str) -> Result<Room, MatchError> {
        self.store
            .get_room(room_id)
            .await?
            .ok_or(MatchError::RoomNotFound)
    }

    /// The room's countdown; an expired room is reported as `RoomExpired`.
    pub async fn room_view(&self, room_id: &str, now: DateTime<Utc>) -> Result<RoomView, MatchError> {
        let room = self.get_room(room_id).await?;
        if !room.is_alive(now) {
            return Err(MatchError::RoomExpired);
        }
        Ok(RoomView::of(&room, now))
    }

    /// Whether `session_token` may still talk in the room.
    ///
    /// Unknown rooms, expired rooms and outsiders all read as `false`.
    pub async fn check_liveness(
        &self,
        room_id: &str,
        session_token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, MatchError> {
        let alive = self
            .store
            .get_room(room_id)
            .await?
            .is_some_and(|room| room.is_participant(session_token) && room.is_alive(now));
        Ok(alive)
    }

    /// Delete rooms that expired more than one room duration before `now`.
    pub async fn purge_expired_rooms(&self, now: DateTime<Utc>) -> Result<usize, MatchError> {
        let cutoff = now - self.settings.room_duration;
        let purged = self.store.purge_rooms_expired_before(cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, "purged expired rooms");
        }
        Ok(purged)
    }
}
