use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::deadpool::PoolError;
use thiserror::Error;

use crate::models::queue_entry::{NewQueueEntry, QueueEntry};
use crate::models::room::{NewRoom, Room};

/// Failures of the queue/room store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (pool exhausted, connection refused).
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store is reachable but not set up the way the engine expects.
    #[error("store misconfigured: {0}")]
    Configuration(String),
    /// Rows read by a transaction were changed by a concurrent one.
    #[error("concurrent modification")]
    Conflict,
    #[error("query failed: {0}")]
    Query(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        match &err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                StoreError::Unavailable(err.to_string())
            }
            diesel::result::Error::DatabaseError(_, info)
                if info.message().contains("does not exist") =>
            {
                StoreError::Configuration(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Timeout(_) | PoolError::Backend(_) | PoolError::Closed => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Configuration(err.to_string()),
        }
    }
}

/// Result of putting a token into the waiting queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued(QueueEntry),
    /// The token was already waiting; the existing entry is untouched.
    AlreadyQueued(QueueEntry),
    /// The token is a party of a room that is still alive.
    InRoom(Room),
}

/// Result of committing a pairing transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingCommit {
    Created(Room),
    /// Nothing was paired: an entry was consumed or dropped concurrently.
    Conflict,
}

/// Persistence for the waiting queue and rooms.
///
/// Backed by PostgreSQL in production and an in-memory map in tests.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert `entry` unless its token is already queued or already in a room
    /// alive at `now`.
    async fn enqueue(&self, entry: NewQueueEntry, now: DateTime<Utc>) -> Result<EnqueueOutcome, StoreError>;

    /// Up to `limit` entries in FIFO order (`enqueued_at`, then `id`).
    async fn peek_earliest(&self, limit: usize) -> Result<Vec<QueueEntry>, StoreError>;

    /// Remove the token's queue entry. Returns whether one existed.
    async fn remove_queue_entry(&self, session_token: &str) -> Result<bool, StoreError>;

    /// Remove entries enqueued strictly before `cutoff`.
    async fn purge_queue_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Atomically delete `first` and `second` by id and insert `room`.
    ///
    /// Returns `Conflict` without pairing if either entry is gone. If either
    /// token already has a room alive at `now`, its entry is dropped and
    /// `Conflict` is returned.
    async fn commit_pairing(
        &self,
        room: NewRoom,
        first: &QueueEntry,
        second: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<PairingCommit, StoreError>;

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError>;

    /// Delete rooms whose expiry is strictly before `cutoff`.
    async fn purge_rooms_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}
