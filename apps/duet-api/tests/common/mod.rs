use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use chrono::{Duration, Utc};
use diesel::pg::PgConnection;
use diesel::{Connection, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use duet_api::config::Config;
use duet_api::db::memory::MemoryStore;
use duet_api::db::pg::PgStore;
use duet_api::models::room::Room;
use duet_api::AppState;

/// Build a test AppState over a fresh in-memory store. No database needed.
pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(Config::default(), store.clone());
    (state, store)
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState, Arc<MemoryStore>) {
    let (state, store) = test_state();
    let app = duet_api::routes::router().with_state(state.clone());
    (app, state, store)
}

/// Start an actual TCP server for WebSocket and HTTP-client testing.
/// The server runs in the background.
pub async fn start_server() -> (SocketAddr, AppState, Arc<MemoryStore>) {
    let (app, state, store) = test_app();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, store)
}

pub fn session_token() -> String {
    duet_common::id::prefixed_ulid(duet_common::id::prefix::SESSION)
}

/// Insert a room between `a` and `b` whose ten minutes ran out a while ago.
pub fn insert_expired_room(store: &MemoryStore, a: &str, b: &str) -> Room {
    let created_at = Utc::now() - Duration::seconds(700);
    let room = Room {
        id: duet_common::id::prefixed_ulid(duet_common::id::prefix::ROOM),
        party_a: a.to_string(),
        party_b: b.to_string(),
        created_at,
        expires_at: created_at + Duration::seconds(600),
    };
    store.insert_room(room.clone());
    room
}

/// Enqueue two fresh tokens over HTTP and pair them. Returns (room_id, a, b).
pub async fn matched_pair(server: &axum_test::TestServer) -> (String, String, String) {
    let a = session_token();
    let b = session_token();

    for token in [&a, &b] {
        server
            .post("/api/v1/queue")
            .json(&serde_json::json!({ "session_token": token }))
            .await
            .assert_status_ok();
    }

    let resp = server.post("/api/v1/match").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["matched"], true);
    let room_id = body["room_id"].as_str().unwrap().to_string();

    (room_id, a, b)
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Tests sharing the test database run one at a time.
static PG_LOCK: Mutex<()> = Mutex::new(());

/// A `PgStore` on the `<database>_test` database, migrated and emptied.
///
/// Returns `None` when DATABASE_URL is unset so the suite still runs without
/// a database. Hold the guard for the whole test.
pub async fn pg_store() -> Option<(Arc<PgStore>, MutexGuard<'static, ()>)> {
    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(env_path);

    let Some(database_url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };
    let database_url = with_test_db_suffix(&database_url);

    let guard = PG_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let url = database_url.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url).expect("connect to test database");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("migrate test database");
        diesel::sql_query("TRUNCATE queue_entries, rooms")
            .execute(&mut conn)
            .expect("reset test tables");
    })
    .await
    .expect("prepare test database");

    let pool = duet_api::db::pool::connect(&database_url, 16).expect("test pool");
    Some((Arc::new(PgStore::new(pool)), guard))
}

fn with_test_db_suffix(database_url: &str) -> String {
    let (base, query) = match database_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (database_url, None),
    };
    match base.rsplit_once('/') {
        Some((prefix, db_name)) if !db_name.is_empty() && !db_name.ends_with("_test") => match query {
            Some(query) => format!("{prefix}/{db_name}_test?{query}"),
            None => format!("{prefix}/{db_name}_test"),
        },
        _ => database_url.to_string(),
    }
}
