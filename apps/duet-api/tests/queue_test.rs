mod common;

use axum::http::StatusCode;
use axum_test::TestServer;

// ===========================================================================
// POST /api/v1/queue
// ===========================================================================

#[tokio::test]
async fn enqueue_success() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let token = common::session_token();

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": token }))
        .await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["already_queued"], false);
    assert_eq!(store.queue_len(), 1);
}

#[tokio::test]
async fn enqueue_twice_is_a_no_op() {
    let (app, state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let token = common::session_token();

    for _ in 0..2 {
        server
            .post("/api/v1/queue")
            .json(&serde_json::json!({ "session_token": token }))
            .await
            .assert_status_ok();
    }

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": format!("  {token}  ") }))
        .await;
    let body: serde_json::Value = resp.json();
    assert_eq!(body["already_queued"], true);

    assert_eq!(store.queue_len(), 1);
    let entries = state.matchmaker.peek_earliest(10).await.unwrap();
    assert_eq!(entries[0].session_token, token);
}

#[tokio::test]
async fn enqueue_missing_token() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.post("/api/v1/queue").json(&serde_json::json!({})).await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "session_token");
    assert_eq!(store.queue_len(), 0);
}

#[tokio::test]
async fn enqueue_without_json_body() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.post("/api/v1/queue").await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "body");
    assert_eq!(store.queue_len(), 0);
}

#[tokio::test]
async fn enqueue_mistyped_token() {
    let (app, _state, _store) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": ["ses_a"] }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<serde_json::Value>()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn enqueue_blank_token() {
    let (app, _state, _store) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": "   " }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn enqueue_store_unavailable() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();
    store.set_unavailable(true);

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": common::session_token() }))
        .await;

    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
}

#[tokio::test]
async fn enqueue_while_in_alive_room_reports_the_room() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let (room_id, a, _b) = common::matched_pair(&server).await;

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": a }))
        .await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "matched");
    assert_eq!(body["room_id"], room_id.as_str());
    assert_eq!(store.queue_len(), 0);
}

#[tokio::test]
async fn enqueue_after_room_expired_queues_again() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let a = common::session_token();
    common::insert_expired_room(&store, &a, &common::session_token());

    let resp = server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": a }))
        .await;

    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "queued");
    assert_eq!(store.queue_len(), 1);
}

// ===========================================================================
// DELETE /api/v1/queue
// ===========================================================================

#[tokio::test]
async fn leave_queue_removes_entry() {
    let (app, _state, store) = common::test_app();
    let server = TestServer::new(app).unwrap();
    let token = common::session_token();

    server
        .post("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": token }))
        .await
        .assert_status_ok();

    let resp = server
        .delete("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": token }))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["removed"], true);
    assert_eq!(store.queue_len(), 0);

    let resp = server
        .delete("/api/v1/queue")
        .json(&serde_json::json!({ "session_token": token }))
        .await;
    assert_eq!(resp.json::<serde_json::Value>()["removed"], false);
}

// ===========================================================================
// POST /api/v1/sessions
// ===========================================================================

#[tokio::test]
async fn create_session_issues_distinct_tokens() {
    let (app, _state, _store) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let first = server.post("/api/v1/sessions").await;
    first.assert_status(StatusCode::CREATED);
    let second = server.post("/api/v1/sessions").await;

    let first = first.json::<serde_json::Value>()["session_token"]
        .as_str()
        .unwrap()
        .to_string();
    let second = second.json::<serde_json::Value>()["session_token"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(first.starts_with("ses_"));
    assert_ne!(first, second);
}

#[tokio::test]
async fn health_ok() {
    let (app, _state, _store) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<serde_json::Value>()["status"], "ok");
}
