use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use scoped_futures::ScopedFutureExt;

use crate::db::pool::DbPool;
use crate::db::schema::{queue_entries, rooms};
use crate::models::queue_entry::{NewQueueEntry, QueueEntry};
use crate::models::room::{NewRoom, Room};

use super::store::{EnqueueOutcome, MatchStore, PairingCommit, StoreError};

const ENQUEUE_ATTEMPTS: usize = 3;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn alive_room_for(
    conn: &mut AsyncPgConnection,
    session_token: &str,
    now: DateTime<Utc>,
) -> Result<Option<Room>, StoreError> {
    let room = diesel_async::RunQueryDsl::get_result(
        rooms::table
            .filter(
                rooms::party_a
                    .eq(session_token)
                    .or(rooms::party_b.eq(session_token)),
            )
            .filter(rooms::expires_at.gt(now))
            .order(rooms::created_at.desc())
            .select(Room::as_select()),
        conn,
    )
    .await
    .optional()?;

    Ok(room)
}

#[async_trait]
impl MatchStore for PgStore {
    async fn enqueue(&self, entry: NewQueueEntry, now: DateTime<Utc>) -> Result<EnqueueOutcome, StoreError> {
        let mut conn = self.pool.get().await?;

        if let Some(room) = alive_room_for(&mut conn, &entry.session_token, now).await? {
            return Ok(EnqueueOutcome::InRoom(room));
        }

        // The existing row can vanish between the insert and the select when a
        // concurrent pairing consumes it, so retry a few times.
        for _ in 0..ENQUEUE_ATTEMPTS {
            let inserted: Option<QueueEntry> = diesel_async::RunQueryDsl::get_result(
                diesel::insert_into(queue_entries::table)
                    .values(&entry)
                    .on_conflict(queue_entries::session_token)
                    .do_nothing()
                    .returning(QueueEntry::as_returning()),
                &mut conn,
            )
            .await
            .optional()?;

            if let Some(inserted) = inserted {
                return Ok(EnqueueOutcome::Queued(inserted));
            }

            let existing: Option<QueueEntry> = diesel_async::RunQueryDsl::get_result(
                queue_entries::table
                    .filter(queue_entries::session_token.eq(&entry.session_token))
                    .select(QueueEntry::as_select()),
                &mut conn,
            )
            .await
            .optional()?;

            if let Some(existing) = existing {
                return Ok(EnqueueOutcome::AlreadyQueued(existing));
            }
        }

        Err(StoreError::Conflict)
    }

    async fn peek_earliest(&self, limit: usize) -> Result<Vec<QueueEntry>, StoreError> {
        let mut conn = self.pool.get().await?;

        let entries = diesel_async::RunQueryDsl::load(
            queue_entries::table
                .order((queue_entries::enqueued_at.asc(), queue_entries::id.asc()))
                .limit(limit as i64)
                .select(QueueEntry::as_select()),
            &mut conn,
        )
        .await?;

        Ok(entries)
    }

    async fn remove_queue_entry(&self, session_token: &str) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel_async::RunQueryDsl::execute(
            diesel::delete(queue_entries::table.filter(queue_entries::session_token.eq(session_token))),
            &mut conn,
        )
        .await?;

        Ok(deleted > 0)
    }

    async fn purge_queue_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel_async::RunQueryDsl::execute(
            diesel::delete(queue_entries::table.filter(queue_entries::enqueued_at.lt(cutoff))),
            &mut conn,
        )
        .await?;

        Ok(deleted)
    }

    async fn commit_pairing(
        &self,
        room: NewRoom,
        first: &QueueEntry,
        second: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<PairingCommit, StoreError> {
        let mut conn = self.pool.get().await?;
        let pair = [first.clone(), second.clone()];

        let result = conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let ids: Vec<i64> = pair.iter().map(|e| e.id).collect();

                    // Row locks in id order; a concurrent pairing on either
                    // entry waits here and then sees it gone.
                    let locked: Vec<QueueEntry> = diesel_async::RunQueryDsl::load(
                        queue_entries::table
                            .filter(queue_entries::id.eq_any(&ids))
                            .order(queue_entries::id.asc())
                            .select(QueueEntry::as_select())
                            .for_update(),
                        conn,
                    )
                    .await?;

                    if locked.len() != ids.len() {
                        return Err(StoreError::Conflict);
                    }

                    for entry in &pair {
                        if alive_room_for(conn, &entry.session_token, now).await?.is_some() {
                            diesel_async::RunQueryDsl::execute(
                                diesel::delete(queue_entries::table.find(entry.id)),
                                conn,
                            )
                            .await?;
                            return Ok(PairingCommit::Conflict);
                        }
                    }

                    let deleted = diesel_async::RunQueryDsl::execute(
                        diesel::delete(queue_entries::table.filter(queue_entries::id.eq_any(&ids))),
                        conn,
                    )
                    .await?;

                    if deleted != ids.len() {
                        return Err(StoreError::Conflict);
                    }

                    let room: Room = diesel_async::RunQueryDsl::get_result(
                        diesel::insert_into(rooms::table)
                            .values(&room)
                            .returning(Room::as_returning()),
                        conn,
                    )
                    .await?;

                    Ok(PairingCommit::Created(room))
                }
                .scope_boxed()
            })
            .await;

        match result {
            Err(StoreError::Conflict) => Ok(PairingCommit::Conflict),
            other => other,
        }
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, StoreError> {
        let mut conn = self.pool.get().await?;

        let room = diesel_async::RunQueryDsl::get_result(
            rooms::table.find(room_id).select(Room::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(room)
    }

    async fn purge_rooms_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel_async::RunQueryDsl::execute(
            diesel::delete(rooms::table.filter(rooms::expires_at.lt(cutoff))),
            &mut conn,
        )
        .await?;

        Ok(deleted)
    }
}
