//! Pairing endpoint, polled by waiting clients.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/match", post(try_match))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MatchResponse {
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /api/v1/match
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/match",
    tag = "Matchmaking",
    responses(
        (status = 200, description = "Pairing attempted", body = MatchResponse),
        (status = 500, description = "Pairing transaction failed", body = ApiErrorBody),
    ),
)]
pub async fn try_match(State(state): State<AppState>) -> Result<Json<MatchResponse>, ApiError> {
    let room = state.matchmaker.try_match(Utc::now()).await?;

    Ok(Json(MatchResponse {
        matched: room.is_some(),
        room_id: room.map(|r| r.id),
    }))
}
