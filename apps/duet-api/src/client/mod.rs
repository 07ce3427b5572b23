//! Client-side SDK for talking to a duet-api server.
//!
//! The pieces compose as follows: a [`SessionIdentity`] names the visitor,
//! a [`Lobby`] gets them into a room, and a [`RoomSubscription`] feeds the
//! room's event stream through a [`DeliveryFilter`] into a transcript.

pub mod api;
pub mod countdown;
pub mod filter;
pub mod gateway;
pub mod identity;
pub mod lobby;
pub mod subscription;

use thiserror::Error;

pub use api::{HttpRoomApi, RoomApi};
pub use filter::{DeliveryFilter, Verdict};
pub use gateway::{GatewayClient, InboundFrame};
pub use identity::SessionIdentity;
pub use lobby::Lobby;
pub use subscription::RoomSubscription;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("gateway protocol error: {0}")]
    Protocol(String),
    #[error("gateway connection closed")]
    Closed,
    /// The server dropped this connection after it missed events. Reconnect
    /// and resubscribe.
    #[error("gateway connection fell behind and was closed")]
    Lagged,
    #[error("timed out")]
    Timeout,
}

impl ClientError {
    /// The server's error code, if the failure came from an API response.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}
