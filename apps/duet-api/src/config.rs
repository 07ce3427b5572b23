use std::str::FromStr;
use std::time::Duration;

use crate::matchmaking::MatchSettings;

const MAX_WORKER_ID: u16 = 1023;

/// Duet API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Lifetime of a room, measured from the pairing transaction.
    pub room_duration_secs: u64,
    /// Queue entries older than this are purged and never matched (0 disables).
    pub queue_entry_ttl_secs: u64,
    /// Run the background pairing worker in addition to client polling.
    pub match_worker: bool,
    /// Wake-up cadence of the background pairing worker.
    pub match_worker_interval_ms: u64,
    /// Upper bound of the database connection pool.
    pub db_max_connections: usize,
    /// Snowflake worker id for queue-entry ids. Must differ between
    /// processes sharing one database.
    pub worker_id: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 4100,
            room_duration_secs: 600,
            queue_entry_ttl_secs: 300,
            match_worker: false,
            match_worker_interval_ms: 3000,
            db_max_connections: 20,
            worker_id: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            port: parsed_var("PORT", defaults.port),
            room_duration_secs: parsed_var("ROOM_DURATION_SECS", defaults.room_duration_secs),
            queue_entry_ttl_secs: parsed_var("QUEUE_ENTRY_TTL_SECS", defaults.queue_entry_ttl_secs),
            match_worker: parsed_var("MATCH_WORKER", defaults.match_worker),
            match_worker_interval_ms: parsed_var(
                "MATCH_WORKER_INTERVAL_MS",
                defaults.match_worker_interval_ms,
            ),
            db_max_connections: parsed_var("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            worker_id: parsed_var("WORKER_ID", defaults.worker_id).min(MAX_WORKER_ID),
        }
    }

    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            room_duration: chrono::Duration::seconds(self.room_duration_secs as i64),
            queue_entry_ttl: (self.queue_entry_ttl_secs > 0)
                .then(|| chrono::Duration::seconds(self.queue_entry_ttl_secs as i64)),
        }
    }

    pub fn match_worker_interval(&self) -> Duration {
        Duration::from_millis(self.match_worker_interval_ms.max(100))
    }
}

fn parsed_var<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_ten_minute_rooms() {
        let settings = Config::default().match_settings();
        assert_eq!(settings.room_duration, chrono::Duration::seconds(600));
        assert_eq!(settings.queue_entry_ttl, Some(chrono::Duration::seconds(300)));
    }

    #[test]
    fn zero_ttl_disables_queue_expiry() {
        let config = Config {
            queue_entry_ttl_secs: 0,
            ..Config::default()
        };
        assert!(config.match_settings().queue_entry_ttl.is_none());
    }
}
