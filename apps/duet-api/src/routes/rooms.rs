//! Room endpoints: countdown view, liveness, and event relay.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::matchmaking::{validate_session_token, RoomView};
use crate::models::chat_event::{ChatEvent, SystemEventType};
use crate::routes::queue::SessionTokenRequest;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/heartbeat", post(heartbeat))
        .route("/rooms/{room_id}/messages", post(post_message))
        .route("/rooms/{room_id}/events", post(post_system_event))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    pub alive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostSystemEventRequest {
    #[serde(default)]
    pub session_token: String,
    /// `joined` or `left`.
    #[serde(default)]
    pub event_type: String,
}

// ---------------------------------------------------------------------------
// GET /api/v1/rooms/:room_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}",
    tag = "Rooms",
    params(("room_id" = String, Path, description = "Room ID")),
    responses(
        (status = 200, description = "Room countdown", body = RoomView),
        (status = 400, description = "Room expired (ROOM_EXPIRED)", body = ApiErrorBody),
        (status = 404, description = "Room not found", body = ApiErrorBody),
    ),
)]
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomView>, ApiError> {
    let view = state.matchmaker.room_view(&room_id, Utc::now()).await?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// POST /api/v1/rooms/:room_id/heartbeat
// ---------------------------------------------------------------------------

/// Liveness poll. Unknown rooms, expired rooms and non-participants all
/// answer `alive: false` rather than an error.
#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/heartbeat",
    tag = "Rooms",
    params(("room_id" = String, Path, description = "Room ID")),
    request_body = SessionTokenRequest,
    responses(
        (status = 200, description = "Liveness for the caller", body = LivenessResponse),
        (status = 400, description = "Missing session token", body = ApiErrorBody),
        (status = 500, description = "Store unavailable", body = ApiErrorBody),
    ),
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    payload: Result<Json<SessionTokenRequest>, JsonRejection>,
) -> Result<Json<LivenessResponse>, ApiError> {
    let Json(body) = payload?;
    let session_token = validate_session_token(&body.session_token)?;
    let alive = state
        .matchmaker
        .check_liveness(&room_id, session_token, Utc::now())
        .await?;
    Ok(Json(LivenessResponse { alive }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/rooms/:room_id/messages
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/messages",
    tag = "Rooms",
    params(("room_id" = String, Path, description = "Room ID")),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message published", body = ChatEvent),
        (status = 400, description = "Validation error or room expired", body = ApiErrorBody),
        (status = 403, description = "Not a participant", body = ApiErrorBody),
        (status = 404, description = "Room not found", body = ApiErrorBody),
        (status = 500, description = "Store or transport unavailable", body = ApiErrorBody),
    ),
)]
pub async fn post_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatEvent>), ApiError> {
    let Json(body) = payload?;
    let session_token = validate_session_token(&body.session_token)?;
    let event = state
        .matchmaker
        .post_message(&room_id, session_token, &body.text, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

// ---------------------------------------------------------------------------
// POST /api/v1/rooms/:room_id/events
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/rooms/{room_id}/events",
    tag = "Rooms",
    params(("room_id" = String, Path, description = "Room ID")),
    request_body = PostSystemEventRequest,
    responses(
        (status = 201, description = "System event published", body = ChatEvent),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 403, description = "Not a participant", body = ApiErrorBody),
        (status = 404, description = "Room not found", body = ApiErrorBody),
        (status = 500, description = "Store or transport unavailable", body = ApiErrorBody),
    ),
)]
pub async fn post_system_event(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    payload: Result<Json<PostSystemEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatEvent>), ApiError> {
    let Json(body) = payload?;
    let session_token = validate_session_token(&body.session_token)?;
    let event_type = SystemEventType::parse(body.event_type.trim()).ok_or_else(|| {
        ApiError::validation(vec![FieldError {
            field: "event_type".to_string(),
            message: "event_type must be one of: joined, left".to_string(),
        }])
    })?;

    let event = state
        .matchmaker
        .post_system_event(&room_id, session_token, event_type, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}
