pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod matchmaking;
pub mod models;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::store::MatchStore;
use gateway::fanout::EventHub;
use matchmaking::Matchmaker;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub matchmaker: Arc<Matchmaker>,
    pub config: Arc<Config>,
    pub broadcast: Arc<EventHub>,
}

impl AppState {
    /// Wire the engine to `store` and a fresh in-process event hub.
    pub fn new(config: Config, store: Arc<dyn MatchStore>) -> Self {
        let broadcast = Arc::new(EventHub::new());
        let matchmaker = Arc::new(Matchmaker::new(
            store,
            broadcast.clone(),
            config.match_settings(),
            config.worker_id,
        ));

        Self {
            matchmaker,
            config: Arc::new(config),
            broadcast,
        }
    }
}
