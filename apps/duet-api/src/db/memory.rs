use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::models::queue_entry::{NewQueueEntry, QueueEntry};
use crate::models::room::{NewRoom, Room};

use super::store::{EnqueueOutcome, MatchStore, PairingCommit, StoreError};

#[derive(Default)]
struct Tables {
    queue: Vec<QueueEntry>,
    rooms: HashMap<String, Room>,
}

impl Tables {
    fn alive_room_for(&self, session_token: &str, now: DateTime<Utc>) -> Option<&Room> {
        self.rooms
            .values()
            .filter(|room| room.is_participant(session_token) && room.is_alive(now))
            .max_by_key(|room| room.created_at)
    }
}

/// In-memory store for local development and tests.
///
/// One lock covers both tables, so every operation (the pairing commit
/// included) is serialized.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn queue_len(&self) -> usize {
        self.tables.lock().queue.len()
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.tables.lock().rooms.values().cloned().collect()
    }

    /// Insert a room directly, bypassing the queue.
    pub fn insert_room(&self, room: Room) {
        self.tables.lock().rooms.insert(room.id.clone(), room);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn enqueue(&self, entry: NewQueueEntry, now: DateTime<Utc>) -> Result<EnqueueOutcome, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();

        if let Some(room) = tables.alive_room_for(&entry.session_token, now) {
            return Ok(EnqueueOutcome::InRoom(room.clone()));
        }
        if let Some(existing) = tables
            .queue
            .iter()
            .find(|e| e.session_token == entry.session_token)
        {
            return Ok(EnqueueOutcome::AlreadyQueued(existing.clone()));
        }

        let entry = QueueEntry::from(entry);
        tables.queue.push(entry.clone());
        Ok(EnqueueOutcome::Queued(entry))
    }

    async fn peek_earliest(&self, limit: usize) -> Result<Vec<QueueEntry>, StoreError> {
        self.check()?;
        let tables = self.tables.lock();

        let mut entries = tables.queue.clone();
        entries.sort_by_key(QueueEntry::fifo_key);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn remove_queue_entry(&self, session_token: &str) -> Result<bool, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();

        let before = tables.queue.len();
        tables.queue.retain(|e| e.session_token != session_token);
        Ok(tables.queue.len() != before)
    }

    async fn purge_queue_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();

        let before = tables.queue.len();
        tables.queue.retain(|e| e.enqueued_at >= cutoff);
        Ok(before - tables.queue.len())
    }

    async fn commit_pairing(
        &self,
        room: NewRoom,
        first: &QueueEntry,
        second: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<PairingCommit, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();

        for entry in [first, second] {
            if tables.alive_room_for(&entry.session_token, now).is_some() {
                tables.queue.retain(|e| e.id != entry.id);
                return Ok(PairingCommit::Conflict);
            }
        }

        let present = tables
            .queue
            .iter()
            .filter(|e| e.id == first.id || e.id == second.id)
            .count();
        if present != 2 {
            return Ok(PairingCommit::Conflict);
        }

        tables.queue.retain(|e| e.id != first.id && e.id != second.id);
        let room = Room::from(room);
        tables.rooms.insert(room.id.clone(), room.clone());
        Ok(PairingCommit::Created(room))
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().rooms.get(room_id).cloned())
    }

    async fn purge_rooms_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock();

        let before = tables.rooms.len();
        tables.rooms.retain(|_, room| room.expires_at >= cutoff);
        Ok(before - tables.rooms.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_entry(id: i64, token: &str, at: DateTime<Utc>) -> NewQueueEntry {
        NewQueueEntry {
            id,
            session_token: token.to_string(),
            enqueued_at: at,
        }
    }

    #[tokio::test]
    async fn enqueue_is_idempotent_per_token() {
        let store = MemoryStore::new();
        let now = Utc::now();

        let first = store.enqueue(new_entry(1, "ses_a", now), now).await.unwrap();
        let second = store
            .enqueue(new_entry(2, "ses_a", now + Duration::seconds(1)), now)
            .await
            .unwrap();

        let EnqueueOutcome::Queued(entry) = first else {
            panic!("expected Queued, got {first:?}");
        };
        assert_eq!(second, EnqueueOutcome::AlreadyQueued(entry));
        assert_eq!(store.queue_len(), 1);
    }

    #[tokio::test]
    async fn peek_orders_by_time_then_id() {
        let store = MemoryStore::new();
        let now = Utc::now();

        store.enqueue(new_entry(30, "ses_c", now), now).await.unwrap();
        store.enqueue(new_entry(20, "ses_b", now), now).await.unwrap();
        store
            .enqueue(new_entry(10, "ses_a", now + Duration::seconds(1)), now)
            .await
            .unwrap();

        let tokens: Vec<String> = store
            .peek_earliest(3)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.session_token)
            .collect();
        assert_eq!(tokens, ["ses_b", "ses_c", "ses_a"]);
    }

    #[tokio::test]
    async fn commit_pairing_conflicts_when_an_entry_is_gone() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.enqueue(new_entry(1, "ses_a", now), now).await.unwrap();
        store.enqueue(new_entry(2, "ses_b", now), now).await.unwrap();
        let entries = store.peek_earliest(2).await.unwrap();

        store.remove_queue_entry("ses_b").await.unwrap();

        let room = NewRoom::pair(&entries[0], &entries[1], now, Duration::seconds(600));
        let commit = store
            .commit_pairing(room, &entries[0], &entries[1], now)
            .await
            .unwrap();
        assert_eq!(commit, PairingCommit::Conflict);
        assert_eq!(store.queue_len(), 1, "surviving entry must stay queued");
        assert!(store.rooms().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);

        let err = store.peek_earliest(2).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn purge_rooms_keeps_recently_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let entry_a = QueueEntry::from(new_entry(1, "ses_a", now));
        let entry_b = QueueEntry::from(new_entry(2, "ses_b", now));
        store.insert_room(NewRoom::pair(&entry_a, &entry_b, now, Duration::seconds(600)).into());

        let removed = store
            .purge_rooms_expired_before(now + Duration::seconds(600))
            .await
            .unwrap();
        assert_eq!(removed, 0);

        let removed = store
            .purge_rooms_expired_before(now + Duration::seconds(601))
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
