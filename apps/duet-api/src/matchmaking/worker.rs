//! Background pairing worker.
//!
//! Runs alongside client polling with the same atomicity contract: it only
//! calls [`Matchmaker::try_match`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::Matchmaker;

pub fn spawn(matchmaker: Arc<Matchmaker>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = interval.as_millis() as u64, "pairing worker started");

        loop {
            tokio::select! {
                _ = matchmaker.enqueued() => {}
                _ = ticker.tick() => {
                    if let Err(err) = matchmaker.purge_expired_rooms(Utc::now()).await {
                        tracing::error!(?err, "failed to purge expired rooms");
                    }
                }
            }

            drain(&matchmaker).await;
        }
    })
}

/// Pair waiters until fewer than two remain. Returns the number of rooms made.
pub async fn drain(matchmaker: &Matchmaker) -> usize {
    let mut created = 0;
    loop {
        match matchmaker.try_match(Utc::now()).await {
            Ok(Some(_)) => created += 1,
            Ok(None) => break,
            Err(err) => {
                tracing::error!(?err, "pairing worker failed");
                break;
            }
        }
    }
    created
}
