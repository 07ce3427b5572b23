use chrono::{DateTime, Utc};

use crate::db::store::PairingCommit;
use crate::gateway::fanout::publish_event;
use crate::gateway::topic::Topic;
use crate::models::chat_event::RoomCreated;
use crate::models::room::{NewRoom, Room};

use super::{MatchError, Matchmaker};

/// Commit attempts per `try_match` call before reporting no match.
const MAX_PAIRING_ATTEMPTS: usize = 5;

impl Matchmaker {
    /// Pair the two earliest waiters into a new room.
    ///
    /// Returns `None` when fewer than two entries are waiting, or when every
    /// attempt lost its entries to a concurrent pairing. A successful pairing
    /// is announced as `room_created` on the matchmaking topic; a failed
    /// announcement is logged and does not undo the pairing.
    pub async fn try_match(&self, now: DateTime<Utc>) -> Result<Option<Room>, MatchError> {
        if let Some(ttl) = self.settings.queue_entry_ttl {
            let purged = self.store.purge_queue_before(now - ttl).await?;
            if purged > 0 {
                tracing::debug!(purged, "dropped stale queue entries");
            }
        }

        for attempt in 1..=MAX_PAIRING_ATTEMPTS {
            let entries = self.store.peek_earliest(2).await?;
            let [first, second] = entries.as_slice() else {
                return Ok(None);
            };

            let draft = NewRoom::pair(first, second, now, self.settings.room_duration);
            match self.store.commit_pairing(draft, first, second, now).await? {
                PairingCommit::Created(room) => {
                    tracing::info!(
                        room_id = %room.id,
                        expires_at = %room.expires_at,
                        "room created"
                    );
                    // The room is committed either way. Waiters that miss the
                    // announcement learn about it from their next enqueue.
                    if let Err(err) = publish_event(
                        self.publisher.as_ref(),
                        &Topic::Matchmaking,
                        RoomCreated::EVENT_NAME,
                        &RoomCreated::from(&room),
                    )
                    .await
                    {
                        tracing::error!(?err, room_id = %room.id, "failed to announce room");
                    }
                    return Ok(Some(room));
                }
                PairingCommit::Conflict => {
                    tracing::debug!(attempt, "pairing lost a race, retrying");
                }
            }
        }

        Ok(None)
    }
}
