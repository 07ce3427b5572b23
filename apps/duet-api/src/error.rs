use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::store::StoreError;
use crate::gateway::fanout::PublishError;
use crate::matchmaking::MatchError;

/// Structured API error returned to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application-level error type that converts into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// The room exists but its time is up. Kept apart from `not_found` so
    /// clients can show "session ended" instead of "no such room".
    pub fn room_expired(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ROOM_EXPIRED", message)
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "STORE_UNAVAILABLE",
            message,
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "CONFIGURATION_ERROR",
            message,
        )
    }

    pub fn transport_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "TRANSPORT_UNAVAILABLE",
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR".to_string(),
            message: "Validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Missing, non-JSON or mistyped request bodies answer like any other
/// validation failure.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(vec![FieldError {
            field: "body".to_string(),
            message: rejection.body_text(),
        }])
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => {
                tracing::error!(?err, "store unavailable");
                Self::store_unavailable("The match store is unavailable")
            }
            StoreError::Configuration(_) => {
                tracing::error!(?err, "store misconfigured");
                Self::configuration("The match store is misconfigured")
            }
            StoreError::Conflict | StoreError::Query(_) => {
                tracing::error!(?err, "store error");
                Self::internal("An internal error occurred")
            }
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        tracing::error!(?err, "event publish failed");
        Self::transport_unavailable("The event transport is unavailable")
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Validation { field, message } => {
                Self::validation(vec![FieldError {
                    field: field.to_string(),
                    message,
                }])
            }
            MatchError::RoomNotFound => Self::not_found("Room not found"),
            MatchError::NotParticipant => {
                Self::forbidden("You are not a participant of this room")
            }
            MatchError::RoomExpired => Self::room_expired("Room expired"),
            MatchError::Store(err) => err.into(),
            MatchError::Publish(err) => err.into(),
        }
    }
}
