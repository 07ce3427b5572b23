//! Waiting queue endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::store::EnqueueOutcome;
use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/queue", post(enqueue).delete(leave_queue))
}

/// Body shared by every endpoint that only identifies the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SessionTokenRequest {
    #[serde(default)]
    pub session_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Queued,
    /// The caller is already a party of an alive room.
    Matched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnqueueResponse {
    pub status: QueueStatus,
    #[serde(default)]
    pub already_queued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaveQueueResponse {
    pub removed: bool,
}

// ---------------------------------------------------------------------------
// POST /api/v1/queue
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/queue",
    tag = "Queue",
    request_body = SessionTokenRequest,
    responses(
        (status = 200, description = "Caller is waiting, or already matched", body = EnqueueResponse),
        (status = 400, description = "Missing session token", body = ApiErrorBody),
        (status = 500, description = "Store unavailable", body = ApiErrorBody),
    ),
)]
pub async fn enqueue(
    State(state): State<AppState>,
    payload: Result<Json<SessionTokenRequest>, JsonRejection>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let Json(body) = payload?;
    let outcome = state.matchmaker.enqueue(&body.session_token, Utc::now()).await?;

    let response = match outcome {
        EnqueueOutcome::Queued(_) => EnqueueResponse {
            status: QueueStatus::Queued,
            already_queued: false,
            room_id: None,
        },
        EnqueueOutcome::AlreadyQueued(_) => EnqueueResponse {
            status: QueueStatus::Queued,
            already_queued: true,
            room_id: None,
        },
        EnqueueOutcome::InRoom(room) => EnqueueResponse {
            status: QueueStatus::Matched,
            already_queued: false,
            room_id: Some(room.id),
        },
    };

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// DELETE /api/v1/queue
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/api/v1/queue",
    tag = "Queue",
    request_body = SessionTokenRequest,
    responses(
        (status = 200, description = "Caller removed from the queue", body = LeaveQueueResponse),
        (status = 400, description = "Missing session token", body = ApiErrorBody),
        (status = 500, description = "Store unavailable", body = ApiErrorBody),
    ),
)]
pub async fn leave_queue(
    State(state): State<AppState>,
    payload: Result<Json<SessionTokenRequest>, JsonRejection>,
) -> Result<Json<LeaveQueueResponse>, ApiError> {
    let Json(body) = payload?;
    let removed = state.matchmaker.leave_queue(&body.session_token).await?;
    Ok(Json(LeaveQueueResponse { removed }))
}
