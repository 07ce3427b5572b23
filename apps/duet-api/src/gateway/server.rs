//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time;

use crate::AppState;

use super::events::{
    ClientMessage, GatewayMessage, HeartbeatPayload, TopicPayload, OP_HEARTBEAT, OP_SUBSCRIBE,
    OP_UNSUBSCRIBE,
};
use super::fanout::BroadcastPayload;
use super::session::GatewaySession;
use super::topic::Topic;

/// Heartbeat interval advertised in HELLO.
pub const HEARTBEAT_INTERVAL_MS: u64 = 41250;

/// Close codes (4000-range for application-level).
const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
const CLOSE_SESSION_TIMEOUT: u16 = 4009;
/// The connection fell too far behind the hub and missed events. Clients
/// reconnect and resubscribe; the new acknowledgment time fences off the gap.
pub const CLOSE_LAGGED: u16 = 4010;

type WsSink = SplitSink<WebSocket, Message>;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();

    // Subscribe to the hub before HELLO so that no event published after a
    // SUBSCRIBED ack can be missed.
    let broadcast_rx = state.broadcast.subscribe();
    let session = GatewaySession::new(duet_common::id::prefixed_ulid(duet_common::id::prefix::GATEWAY));

    let hello = GatewayMessage::hello(&session.connection_id, HEARTBEAT_INTERVAL_MS);
    if send_message(&mut ws_tx, &hello).await.is_err() {
        return;
    }

    tracing::info!(connection_id = %session.connection_id, "gateway session established");

    let connection_id = session.connection_id.clone();
    run_session(session, ws_tx, ws_rx, broadcast_rx).await;

    tracing::info!(%connection_id, "gateway session ended");
}

/// Main session event loop: read client messages, forward broadcasts, enforce heartbeat.
async fn run_session(
    mut session: GatewaySession,
    mut ws_tx: WsSink,
    mut ws_rx: SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<Arc<BroadcastPayload>>,
) {
    // Heartbeat deadline: client must heartbeat within 1.5× the interval.
    let heartbeat_deadline = Duration::from_millis(HEARTBEAT_INTERVAL_MS * 3 / 2);
    let mut heartbeat_timer = time::interval(heartbeat_deadline);
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = true;

    loop {
        tokio::select! {
            // Client sends us a message.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match handle_frame(&mut session, &text) {
                            FrameOutcome::Reply(reply) => reply,
                            FrameOutcome::Heartbeat(ack) => {
                                got_heartbeat = true;
                                ack
                            }
                            FrameOutcome::Silent => continue,
                            FrameOutcome::Close(code, reason) => {
                                let _ = send_close(&mut ws_tx, code, reason).await;
                                break;
                            }
                        };
                        if send_message(&mut ws_tx, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Broadcast event from the fanout hub.
            result = broadcast_rx.recv() => {
                match result {
                    Ok(payload) => {
                        if !session.is_subscribed(&payload.topic) {
                            continue;
                        }

                        let seq = session.next_seq();
                        let msg = GatewayMessage::dispatch(
                            &payload.topic.to_string(),
                            &payload.event_name,
                            seq,
                            payload.data.clone(),
                        );
                        if send_message(&mut ws_tx, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            connection_id = %session.connection_id,
                            skipped = n,
                            "gateway session lagged behind broadcast, closing"
                        );
                        let _ = send_close(&mut ws_tx, CLOSE_LAGGED, "Missed events").await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            // Heartbeat timeout check.
            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(
                        connection_id = %session.connection_id,
                        "heartbeat timeout, closing connection"
                    );
                    let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

/// What the loop does in response to one client text frame.
enum FrameOutcome {
    Reply(GatewayMessage),
    Heartbeat(GatewayMessage),
    Silent,
    Close(u16, &'static str),
}

fn handle_frame(session: &mut GatewaySession, text: &str) -> FrameOutcome {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        return FrameOutcome::Reply(GatewayMessage::error("Invalid JSON"));
    };

    match msg.op {
        OP_HEARTBEAT => {
            let seq = serde_json::from_value::<HeartbeatPayload>(msg.d)
                .map(|p| p.seq)
                .unwrap_or(0);
            FrameOutcome::Heartbeat(GatewayMessage::heartbeat_ack(seq))
        }
        OP_SUBSCRIBE => match parse_topic(msg.d) {
            Ok(topic) => {
                tracing::debug!(connection_id = %session.connection_id, %topic, "subscribed");
                let ack = GatewayMessage::subscribed(&topic.to_string());
                session.subscribe(topic);
                FrameOutcome::Reply(ack)
            }
            Err(message) => FrameOutcome::Reply(GatewayMessage::error(&message)),
        },
        OP_UNSUBSCRIBE => match parse_topic(msg.d) {
            Ok(topic) => {
                tracing::debug!(connection_id = %session.connection_id, %topic, "unsubscribed");
                session.unsubscribe(&topic);
                FrameOutcome::Silent
            }
            Err(message) => FrameOutcome::Reply(GatewayMessage::error(&message)),
        },
        _ => FrameOutcome::Close(CLOSE_UNKNOWN_OPCODE, "Unknown opcode"),
    }
}

fn parse_topic(data: serde_json::Value) -> Result<Topic, String> {
    let payload: TopicPayload =
        serde_json::from_value(data).map_err(|_| "Expected {\"topic\": string}".to_string())?;
    payload.topic.parse::<Topic>().map_err(|e| e.to_string())
}

async fn send_message(ws_tx: &mut WsSink, msg: &GatewayMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::events::{OP_ERROR, OP_HEARTBEAT_ACK, OP_SUBSCRIBED};

    fn reply(outcome: FrameOutcome) -> GatewayMessage {
        match outcome {
            FrameOutcome::Reply(msg) | FrameOutcome::Heartbeat(msg) => msg,
            FrameOutcome::Silent => panic!("expected a reply, got silence"),
            FrameOutcome::Close(code, _) => panic!("expected a reply, got close {code}"),
        }
    }

    #[test]
    fn subscribe_then_unsubscribe() {
        let mut session = GatewaySession::new("gw_test".to_string());

        let ack = reply(handle_frame(&mut session, r#"{"op":2,"d":{"topic":"room-abc"}}"#));
        assert_eq!(ack.op, OP_SUBSCRIBED);
        assert!(session.is_subscribed(&Topic::room("abc")));

        let outcome = handle_frame(&mut session, r#"{"op":3,"d":{"topic":"room-abc"}}"#);
        assert!(matches!(outcome, FrameOutcome::Silent));
        assert!(!session.is_subscribed(&Topic::room("abc")));
    }

    #[test]
    fn heartbeat_echoes_seq() {
        let mut session = GatewaySession::new("gw_test".to_string());
        let outcome = handle_frame(&mut session, r#"{"op":1,"d":{"seq":7}}"#);
        let FrameOutcome::Heartbeat(ack) = outcome else {
            panic!("expected heartbeat ack");
        };
        assert_eq!(ack.op, OP_HEARTBEAT_ACK);
        assert_eq!(ack.d["ack"], 7);
    }

    #[test]
    fn malformed_frames_get_errors() {
        let mut session = GatewaySession::new("gw_test".to_string());

        assert_eq!(reply(handle_frame(&mut session, "not json")).op, OP_ERROR);
        assert_eq!(
            reply(handle_frame(&mut session, r#"{"op":2,"d":{"topic":"lobby"}}"#)).op,
            OP_ERROR
        );
        assert_eq!(reply(handle_frame(&mut session, r#"{"op":2,"d":{}}"#)).op, OP_ERROR);
        assert_eq!(session.topic_count(), 0);
    }

    #[test]
    fn unknown_opcode_closes() {
        let mut session = GatewaySession::new("gw_test".to_string());
        let outcome = handle_frame(&mut session, r#"{"op":42,"d":null}"#);
        assert!(matches!(outcome, FrameOutcome::Close(CLOSE_UNKNOWN_OPCODE, _)));
    }
}
