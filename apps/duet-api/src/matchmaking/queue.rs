use chrono::{DateTime, Utc};

use crate::db::store::EnqueueOutcome;
use crate::models::queue_entry::{NewQueueEntry, QueueEntry};

use super::{MatchError, Matchmaker};

pub const MAX_SESSION_TOKEN_LEN: usize = 128;

/// Trim and check a caller-supplied session token.
pub fn validate_session_token(token: &str) -> Result<&str, MatchError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(MatchError::validation("session_token", "session_token is required"));
    }
    if token.chars().count() > MAX_SESSION_TOKEN_LEN {
        return Err(MatchError::validation(
            "session_token",
            format!("session_token must be at most {MAX_SESSION_TOKEN_LEN} characters"),
        ));
    }
    Ok(token)
}

impl Matchmaker {
    /// Put `session_token` in the waiting queue.
    ///
    /// Re-enqueueing a waiting token is a successful no-op, and a token that
    /// is already a party of an alive room gets that room back instead.
    pub async fn enqueue(&self, session_token: &str, now: DateTime<Utc>) -> Result<EnqueueOutcome, MatchError> {
        let session_token = validate_session_token(session_token)?;

        let entry = NewQueueEntry {
            id: self.snowflake.generate(),
            session_token: session_token.to_string(),
            enqueued_at: now,
        };

        let outcome = self.store.enqueue(entry, now).await?;
        match &outcome {
            EnqueueOutcome::Queued(entry) => {
                tracing::debug!(entry_id = entry.id, "session enqueued");
                self.wake.notify_one();
            }
            EnqueueOutcome::AlreadyQueued(entry) => {
                tracing::debug!(entry_id = entry.id, "session already queued");
            }
            EnqueueOutcome::InRoom(room) => {
                tracing::debug!(room_id = %room.id, "session already in an alive room");
            }
        }
        Ok(outcome)
    }

    /// Remove the token from the waiting queue. Returns whether it was waiting.
    pub async fn leave_queue(&self, session_token: &str) -> Result<bool, MatchError> {
        let session_token = validate_session_token(session_token)?;
        Ok(self.store.remove_queue_entry(session_token).await?)
    }

    /// Up to `n` waiting entries, earliest first.
    pub async fn peek_earliest(&self, n: usize) -> Result<Vec<QueueEntry>, MatchError> {
        Ok(self.store.peek_earliest(n).await?)
    }
}
