//! The matchmaking and room lifecycle engine.
//!
//! [`Matchmaker`] owns the waiting queue, the pairing transaction, room
//! liveness and the relay of chat and membership events. Every operation
//! takes the current time explicitly; expiry is always derived from it.

mod lifecycle;
mod pairing;
mod queue;
mod relay;
pub mod worker;

use std::sync::Arc;

use chrono::Duration;
use duet_common::SnowflakeGenerator;
use thiserror::Error;
use tokio::sync::Notify;

use crate::db::store::{MatchStore, StoreError};
use crate::gateway::fanout::{EventPublisher, PublishError};

pub use lifecycle::RoomView;
pub use queue::{MAX_SESSION_TOKEN_LEN, validate_session_token};
pub use relay::MAX_MESSAGE_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSettings {
    pub room_duration: Duration,
    /// Entries waiting longer than this are purged before pairing.
    pub queue_entry_ttl: Option<Duration>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            room_duration: Duration::seconds(600),
            queue_entry_ttl: Some(Duration::seconds(300)),
        }
    }
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("room not found")]
    RoomNotFound,
    #[error("not a participant of this room")]
    NotParticipant,
    #[error("room has expired")]
    RoomExpired,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl MatchError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        MatchError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub struct Matchmaker {
    store: Arc<dyn MatchStore>,
    publisher: Arc<dyn EventPublisher>,
    snowflake: SnowflakeGenerator,
    settings: MatchSettings,
    wake: Notify,
}

impl Matchmaker {
    pub fn new(
        store: Arc<dyn MatchStore>,
        publisher: Arc<dyn EventPublisher>,
        settings: MatchSettings,
        worker_id: u16,
    ) -> Self {
        Self {
            store,
            publisher,
            snowflake: SnowflakeGenerator::new(worker_id),
            settings,
            wake: Notify::new(),
        }
    }

    /// Resolves after the next successful enqueue.
    pub async fn enqueued(&self) {
        self.wake.notified().await
    }
}
