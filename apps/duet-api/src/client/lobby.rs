use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::gateway::topic::Topic;
use crate::matchmaking::RoomView;
use crate::models::chat_event::RoomCreated;
use crate::routes::queue::QueueStatus;

use super::api::RoomApi;
use super::gateway::{GatewayClient, InboundFrame};
use super::ClientError;

/// Cadence of client-driven pairing attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

const ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Gets one visitor from the waiting queue into a room.
pub struct Lobby {
    api: Arc<dyn RoomApi>,
    session_token: String,
    poll_interval: Duration,
}

impl Lobby {
    pub fn new(api: Arc<dyn RoomApi>, session_token: impl Into<String>) -> Self {
        Self {
            api,
            session_token: session_token.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Wait on the matchmaking topic until a room naming this visitor is
    /// created, polling the pairing endpoint meanwhile.
    ///
    /// The enqueue is repeated on every poll: it is idempotent, puts the
    /// visitor back if their entry aged out, and reports a room whose
    /// `room_created` this client missed.
    pub async fn find_room(&self, gateway: &mut GatewayClient, timeout: Duration) -> Result<RoomView, ClientError> {
        time::timeout(timeout, self.wait_for_room(gateway))
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    /// Leave the queue, e.g. when the visitor gives up.
    pub async fn cancel(&self) -> Result<bool, ClientError> {
        self.api.leave_queue(&self.session_token).await
    }

    async fn wait_for_room(&self, gateway: &mut GatewayClient) -> Result<RoomView, ClientError> {
        gateway.subscribe_and_wait(&Topic::Matchmaking, ACK_TIMEOUT).await?;

        let mut poll = time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut heartbeat = time::interval(gateway.heartbeat_interval());
        heartbeat.tick().await;

        let room_id = loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Some(room_id) = self.poll_once().await? {
                        break room_id;
                    }
                }
                _ = heartbeat.tick() => gateway.heartbeat().await?,
                frame = gateway.next_frame() => {
                    if let InboundFrame::Dispatch { event_name, data, .. } = frame? {
                        if event_name != RoomCreated::EVENT_NAME {
                            continue;
                        }
                        let created: RoomCreated = serde_json::from_value(data)?;
                        if created.includes(&self.session_token) {
                            break created.room_id;
                        }
                    }
                }
            }
        };

        if let Err(err) = gateway.unsubscribe(&Topic::Matchmaking).await {
            tracing::debug!(?err, "failed to leave the matchmaking topic");
        }
        tracing::info!(%room_id, "matched");
        self.api.room(&room_id).await
    }

    /// Enqueue (idempotent) and attempt one pairing. Returns the room id if
    /// the visitor is already in a room.
    async fn poll_once(&self) -> Result<Option<String>, ClientError> {
        let queued = self.api.enqueue(&self.session_token).await?;
        if queued.status == QueueStatus::Matched {
            return Ok(queued.room_id);
        }

        // A pairing made here may be someone else's; room_created decides.
        self.api.try_match().await?;
        Ok(None)
    }
}
