use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::gateway::topic::Topic;
use crate::models::chat_event::{ChatEvent, SystemEventType};

use super::api::RoomApi;
use super::filter::{DeliveryFilter, Verdict};
use super::ClientError;

/// One client's subscription to one room.
///
/// Owns the delivery filter, the transcript and the membership guards: at
/// most one `joined` (sent only after the transport ack) and at most one
/// `left` (shared by manual leave and teardown) per subscription. Each guard
/// is set before its request goes out, so a failed or concurrent send is
/// never repeated.
pub struct RoomSubscription {
    room_id: String,
    session_token: String,
    api: Arc<dyn RoomApi>,
    filter: DeliveryFilter,
    transcript: Vec<ChatEvent>,
    joined_sent: bool,
    left_sent: bool,
}

impl RoomSubscription {
    pub fn new(room_id: impl Into<String>, session_token: impl Into<String>, api: Arc<dyn RoomApi>) -> Self {
        Self {
            room_id: room_id.into(),
            session_token: session_token.into(),
            api,
            filter: DeliveryFilter::new(),
            transcript: Vec::new(),
            joined_sent: false,
            left_sent: false,
        }
    }

    pub fn topic(&self) -> Topic {
        Topic::room(&self.room_id)
    }

    pub fn is_ready(&self) -> bool {
        self.filter.is_ready()
    }

    /// Accepted events in arrival order.
    pub fn transcript(&self) -> &[ChatEvent] {
        &self.transcript
    }

    /// Handle the transport's subscription acknowledgment: open the gate and
    /// announce `joined` once.
    pub async fn on_subscribed(&mut self, at: DateTime<Utc>) -> Result<(), ClientError> {
        self.filter.mark_ready(at);

        if self.joined_sent || self.left_sent {
            return Ok(());
        }
        self.joined_sent = true;

        self.api
            .post_system_event(&self.room_id, &self.session_token, SystemEventType::Joined)
            .await?;
        Ok(())
    }

    /// Run one event through the filter, appending it if accepted.
    pub fn on_event(&mut self, event: ChatEvent) -> Verdict {
        let verdict = self.filter.inspect(&event.id, event.timestamp);
        if verdict.is_accepted() {
            self.transcript.push(event);
        } else {
            tracing::debug!(event_id = %event.id, ?verdict, "event filtered");
        }
        verdict
    }

    /// Decode a gateway dispatch for this room's topic. Other topics and
    /// event names yield `None`.
    pub fn on_dispatch(&mut self, topic: &str, event_name: &str, data: Value) -> Result<Option<Verdict>, ClientError> {
        if topic != self.topic().to_string() {
            return Ok(None);
        }
        if event_name != ChatEvent::MESSAGE && event_name != ChatEvent::SYSTEM {
            return Ok(None);
        }
        let event: ChatEvent = serde_json::from_value(data)?;
        Ok(Some(self.on_event(event)))
    }

    /// Announce `left`. Returns false if it was already announced.
    pub async fn leave(&mut self) -> Result<bool, ClientError> {
        if self.left_sent {
            return Ok(false);
        }
        self.left_sent = true;

        self.api
            .post_system_event(&self.room_id, &self.session_token, SystemEventType::Left)
            .await?;
        Ok(true)
    }

    /// End the subscription: announce `left` unless already done and close
    /// the gate. The transcript is kept.
    pub async fn teardown(&mut self) -> Result<(), ClientError> {
        let result = self.leave().await;
        self.filter.reset();
        result.map(|_| ())
    }
}
