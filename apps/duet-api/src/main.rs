use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duet_api::config::Config;
use duet_api::db::memory::MemoryStore;
use duet_api::db::pg::PgStore;
use duet_api::db::store::MatchStore;
use duet_api::matchmaking::worker;
use duet_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let store: Arc<dyn MatchStore> = match &config.database_url {
        Some(url) => {
            let pool = duet_api::db::pool::connect(url, config.db_max_connections)
                .expect("failed to create database pool");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, state is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    tracing::info!(
        room_duration_secs = config.room_duration_secs,
        queue_entry_ttl_secs = config.queue_entry_ttl_secs,
        match_worker = config.match_worker,
        "duet-api configured"
    );

    let worker_interval = config.match_worker.then(|| config.match_worker_interval());
    let state = AppState::new(config, store);

    if let Some(interval) = worker_interval {
        worker::spawn(state.matchmaker.clone(), interval);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(duet_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "duet-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("duet-api stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
