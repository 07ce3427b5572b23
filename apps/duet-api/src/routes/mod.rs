pub mod health;
pub mod matches;
pub mod queue;
pub mod rooms;
pub mod sessions;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api/v1",
            sessions::router()
                .merge(queue::router())
                .merge(matches::router())
                .merge(rooms::router()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Sessions
        sessions::create_session,
        // Queue
        queue::enqueue,
        queue::leave_queue,
        // Matchmaking
        matches::try_match,
        // Rooms
        rooms::get_room,
        rooms::heartbeat,
        rooms::post_message,
        rooms::post_system_event,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::room::Room,
            crate::models::queue_entry::QueueEntry,
            crate::models::chat_event::ChatEvent,
            crate::models::chat_event::ChatEventKind,
            crate::models::chat_event::SystemEventType,
            crate::models::chat_event::RoomCreated,
            crate::matchmaking::RoomView,
            // Route request/response types
            health::HealthResponse,
            sessions::SessionResponse,
            queue::SessionTokenRequest,
            queue::QueueStatus,
            queue::EnqueueResponse,
            queue::LeaveQueueResponse,
            matches::MatchResponse,
            rooms::LivenessResponse,
            rooms::PostMessageRequest,
            rooms::PostSystemEventRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Sessions", description = "Anonymous session tokens"),
        (name = "Queue", description = "Waiting queue"),
        (name = "Matchmaking", description = "Pairing transaction"),
        (name = "Rooms", description = "Room lifecycle and event relay"),
    )
)]
pub struct ApiDoc;
