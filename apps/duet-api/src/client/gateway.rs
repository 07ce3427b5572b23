//! WebSocket client for the duet-api gateway.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::gateway::events::{
    ClientMessage, GatewayMessage, HelloPayload, TopicPayload, OP_DISPATCH, OP_ERROR, OP_HEARTBEAT_ACK, OP_HELLO,
    OP_SUBSCRIBED,
};
use crate::gateway::server::CLOSE_LAGGED;
use crate::gateway::topic::Topic;

use super::ClientError;

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Dispatch {
        topic: String,
        event_name: String,
        data: Value,
    },
    /// Subscription acknowledgment, stamped with the local receive time.
    Subscribed { topic: String, at: DateTime<Utc> },
    HeartbeatAck { seq: u64 },
    Error { message: String },
}

pub struct GatewayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    hello: HelloPayload,
    heartbeat_seq: u64,
    /// Frames read while waiting for something else.
    pending: VecDeque<InboundFrame>,
}

impl GatewayClient {
    /// Connect to `url` (e.g. `ws://localhost:4100/gateway`) and read HELLO.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (mut ws, _) = tokio_tungstenite::connect_async(url).await?;

        let hello = loop {
            let msg = read_message(&mut ws).await?;
            if msg.op == OP_HELLO {
                break serde_json::from_value::<HelloPayload>(msg.d)?;
            }
        };

        tracing::debug!(connection_id = %hello.connection_id, "gateway connected");

        Ok(Self {
            ws,
            hello,
            heartbeat_seq: 0,
            pending: VecDeque::new(),
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.hello.heartbeat_interval)
    }

    pub async fn heartbeat(&mut self) -> Result<(), ClientError> {
        self.heartbeat_seq += 1;
        self.send(&ClientMessage::heartbeat(self.heartbeat_seq)).await
    }

    pub async fn subscribe(&mut self, topic: &Topic) -> Result<(), ClientError> {
        self.send(&ClientMessage::subscribe(&topic.to_string())).await
    }

    pub async fn unsubscribe(&mut self, topic: &Topic) -> Result<(), ClientError> {
        self.send(&ClientMessage::unsubscribe(&topic.to_string())).await
    }

    /// Subscribe and wait for the acknowledgment. Returns the ack instant.
    ///
    /// Frames that arrive before the ack stay queued for
    /// [`next_frame`](Self::next_frame).
    pub async fn subscribe_and_wait(&mut self, topic: &Topic, timeout: Duration) -> Result<DateTime<Utc>, ClientError> {
        self.subscribe(topic).await?;
        let wanted = topic.to_string();

        let mut held = VecDeque::new();
        let result = tokio::time::timeout(timeout, async {
            loop {
                match self.read_frame().await? {
                    InboundFrame::Subscribed { topic, at } if topic == wanted => return Ok(at),
                    InboundFrame::Error { message } => return Err(ClientError::Protocol(message)),
                    other => held.push_back(other),
                }
            }
        })
        .await;

        self.pending.extend(held);
        result.map_err(|_| ClientError::Timeout)?
    }

    /// Next frame, queued frames first. Cancel-safe.
    pub async fn next_frame(&mut self) -> Result<InboundFrame, ClientError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(frame);
        }
        self.read_frame().await
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        Ok(())
    }

    async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let json = serde_json::to_string(msg)?;
        self.ws.send(Message::Text(json.into())).await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<InboundFrame, ClientError> {
        loop {
            let msg = read_message(&mut self.ws).await?;
            match msg.op {
                OP_DISPATCH => {
                    return Ok(InboundFrame::Dispatch {
                        topic: msg.topic.unwrap_or_default(),
                        event_name: msg.t.unwrap_or_default(),
                        data: msg.d,
                    })
                }
                OP_SUBSCRIBED => {
                    let at = Utc::now();
                    let payload: TopicPayload = serde_json::from_value(msg.d)?;
                    return Ok(InboundFrame::Subscribed {
                        topic: payload.topic,
                        at,
                    });
                }
                OP_HEARTBEAT_ACK => {
                    let seq = msg.d.get("ack").and_then(Value::as_u64).unwrap_or(0);
                    return Ok(InboundFrame::HeartbeatAck { seq });
                }
                OP_ERROR => {
                    let message = msg.d.get("message").and_then(Value::as_str).unwrap_or_default();
                    return Ok(InboundFrame::Error {
                        message: message.to_string(),
                    });
                }
                op => tracing::debug!(op, "ignoring gateway frame"),
            }
        }
    }
}

async fn read_message(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>) -> Result<GatewayMessage, ClientError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(Message::Close(Some(frame)))) if u16::from(frame.code) == CLOSE_LAGGED => {
                return Err(ClientError::Lagged)
            }
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(err)) => return Err(err.into()),
        }
    }
}
