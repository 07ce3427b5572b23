use chrono::{DateTime, Utc};

use crate::gateway::fanout::publish_event;
use crate::gateway::topic::Topic;
use crate::models::chat_event::{ChatEvent, SystemEventType};
use crate::models::room::Room;

use super::{MatchError, Matchmaker};

pub const MAX_MESSAGE_LEN: usize = 4000;

impl Matchmaker {
    /// Relay a chat message to the room topic and return the published event.
    pub async fn post_message(
        &self,
        room_id: &str,
        session_token: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatEvent, MatchError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(MatchError::validation("text", "text must not be empty"));
        }
        if trimmed.chars().count() > MAX_MESSAGE_LEN {
            return Err(MatchError::validation(
                "text",
                format!("text must be at most {MAX_MESSAGE_LEN} characters"),
            ));
        }

        let room = self.participant_room(room_id, session_token).await?;
        if !room.is_alive(now) {
            return Err(MatchError::RoomExpired);
        }

        let event = ChatEvent::message(session_token, trimmed, now);
        self.publish_to_room(&room, &event).await?;
        Ok(event)
    }

    /// Announce a membership change. Allowed after expiry so that a `left`
    /// can still be delivered.
    pub async fn post_system_event(
        &self,
        room_id: &str,
        session_token: &str,
        event_type: SystemEventType,
        now: DateTime<Utc>,
    ) -> Result<ChatEvent, MatchError> {
        let room = self.participant_room(room_id, session_token).await?;

        let event = ChatEvent::system(session_token, event_type, now);
        self.publish_to_room(&room, &event).await?;
        Ok(event)
    }

    async fn participant_room(&self, room_id: &str, session_token: &str) -> Result<Room, MatchError> {
        let room = self.get_room(room_id).await?;
        if !room.is_participant(session_token) {
            return Err(MatchError::NotParticipant);
        }
        Ok(room)
    }

    async fn publish_to_room(&self, room: &Room, event: &ChatEvent) -> Result<(), MatchError> {
        publish_event(
            self.publisher.as_ref(),
            &Topic::room(&room.id),
            event.event_name(),
            event,
        )
        .await?;
        tracing::debug!(room_id = %room.id, event_id = %event.id, event = event.event_name(), "event relayed");
        Ok(())
    }
}
