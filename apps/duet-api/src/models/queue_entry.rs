use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::queue_entries;

/// A visitor waiting to be paired. At most one entry exists per token.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = queue_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct QueueEntry {
    pub id: i64,
    pub session_token: String,
    pub enqueued_at: DateTime<Utc>,
}

impl QueueEntry {
    /// FIFO position: enqueue time first, insertion id as the tie-break.
    pub fn fifo_key(&self) -> (DateTime<Utc>, i64) {
        (self.enqueued_at, self.id)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queue_entries)]
pub struct NewQueueEntry {
    pub id: i64,
    pub session_token: String,
    pub enqueued_at: DateTime<Utc>,
}

impl From<NewQueueEntry> for QueueEntry {
    fn from(entry: NewQueueEntry) -> Self {
        Self {
            id: entry.id,
            session_token: entry.session_token,
            enqueued_at: entry.enqueued_at,
        }
    }
}
