//! Anonymous session issuance.

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/sessions", post(create_session))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session_token: String,
}

// ---------------------------------------------------------------------------
// POST /api/v1/sessions
// ---------------------------------------------------------------------------

/// Issue a fresh session token for clients that do not mint their own.
/// Tokens are not recorded server-side and never expire.
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    tag = "Sessions",
    responses(
        (status = 201, description = "Session token issued", body = SessionResponse),
    ),
)]
pub async fn create_session() -> (StatusCode, Json<SessionResponse>) {
    let session_token = duet_common::id::prefixed_ulid(duet_common::id::prefix::SESSION);
    (StatusCode::CREATED, Json(SessionResponse { session_token }))
}
