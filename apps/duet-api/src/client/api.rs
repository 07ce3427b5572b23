use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::error::ApiErrorBody;
use crate::matchmaking::RoomView;
use crate::models::chat_event::{ChatEvent, SystemEventType};
use crate::routes::matches::MatchResponse;
use crate::routes::queue::{EnqueueResponse, LeaveQueueResponse, SessionTokenRequest};
use crate::routes::rooms::{LivenessResponse, PostMessageRequest, PostSystemEventRequest};
use crate::routes::sessions::SessionResponse;

use super::ClientError;

/// The server operations a client drives.
#[async_trait]
pub trait RoomApi: Send + Sync {
    async fn create_session(&self) -> Result<String, ClientError>;
    async fn enqueue(&self, session_token: &str) -> Result<EnqueueResponse, ClientError>;
    async fn leave_queue(&self, session_token: &str) -> Result<bool, ClientError>;
    async fn try_match(&self) -> Result<MatchResponse, ClientError>;
    async fn room(&self, room_id: &str) -> Result<RoomView, ClientError>;
    async fn check_liveness(&self, room_id: &str, session_token: &str) -> Result<bool, ClientError>;
    async fn post_message(&self, room_id: &str, session_token: &str, text: &str) -> Result<ChatEvent, ClientError>;
    async fn post_system_event(
        &self,
        room_id: &str,
        session_token: &str,
        event_type: SystemEventType,
    ) -> Result<ChatEvent, ClientError>;
}

/// [`RoomApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRoomApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpRoomApi {
    /// `base_url` is the server root, e.g. `http://localhost:4100`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let resp = request.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => ClientError::Api {
            status: status.as_u16(),
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: "HTTP_ERROR".to_string(),
            message: body,
        },
    })
}

fn token_body(session_token: &str) -> SessionTokenRequest {
    SessionTokenRequest {
        session_token: session_token.to_string(),
    }
}

#[async_trait]
impl RoomApi for HttpRoomApi {
    async fn create_session(&self) -> Result<String, ClientError> {
        let resp: SessionResponse = send(self.http.post(self.url("/sessions"))).await?;
        Ok(resp.session_token)
    }

    async fn enqueue(&self, session_token: &str) -> Result<EnqueueResponse, ClientError> {
        send(self.http.post(self.url("/queue")).json(&token_body(session_token))).await
    }

    async fn leave_queue(&self, session_token: &str) -> Result<bool, ClientError> {
        let resp: LeaveQueueResponse =
            send(self.http.delete(self.url("/queue")).json(&token_body(session_token))).await?;
        Ok(resp.removed)
    }

    async fn try_match(&self) -> Result<MatchResponse, ClientError> {
        send(self.http.post(self.url("/match"))).await
    }

    async fn room(&self, room_id: &str) -> Result<RoomView, ClientError> {
        send(self.http.get(self.url(&format!("/rooms/{room_id}")))).await
    }

    async fn check_liveness(&self, room_id: &str, session_token: &str) -> Result<bool, ClientError> {
        let resp: LivenessResponse = send(
            self.http
                .post(self.url(&format!("/rooms/{room_id}/heartbeat")))
                .json(&token_body(session_token)),
        )
        .await?;
        Ok(resp.alive)
    }

    async fn post_message(&self, room_id: &str, session_token: &str, text: &str) -> Result<ChatEvent, ClientError> {
        let body = PostMessageRequest {
            session_token: session_token.to_string(),
            text: text.to_string(),
        };
        send(self.http.post(self.url(&format!("/rooms/{room_id}/messages"))).json(&body)).await
    }

    async fn post_system_event(
        &self,
        room_id: &str,
        session_token: &str,
        event_type: SystemEventType,
    ) -> Result<ChatEvent, ClientError> {
        let body = PostSystemEventRequest {
            session_token: session_token.to_string(),
            event_type: event_type.as_str().to_string(),
        };
        send(self.http.post(self.url(&format!("/rooms/{room_id}/events"))).json(&body)).await
    }
}
