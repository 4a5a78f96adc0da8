//! WebSocket upgrade and per-socket read/write loops.
//!
//! The transport's only jobs: assign the session id, register with the
//! coordinator, forward heartbeat frames, and unregister on disconnect.
//! Non-heartbeat inbound frames belong to business dispatch, which is not
//! the coordinator's concern — they are logged and dropped here.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use relay_core::ids::{SessionId, UserId};
use relay_core::transport::{CloseReason, ConnectionHandle};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::connection::{OUTBOUND_BUFFER, Outbound, WsConnection};

/// Upgrade query parameters.
///
/// `userId` stands in for the authentication step, which is outside this
/// server's scope — a production deployment terminates auth in front and
/// injects the verified identity here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    /// Authenticated user identity for this socket.
    pub user_id: String,
}

/// `GET /ws?userId=…` — upgrade and hand the socket to the coordinator.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if query.user_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "userId required").into_response();
    }
    let user = UserId::from(query.user_id.as_str());
    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

async fn handle_socket(state: AppState, user: UserId, socket: WebSocket) {
    // Transport-assigned, unique for the socket's lifetime.
    let session_id = SessionId::new(uuid::Uuid::now_v7().to_string());
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let conn = Arc::new(WsConnection::new(session_id, outbound_tx));

    let session = match state
        .coordinator
        .register(user.clone(), Arc::clone(&conn) as Arc<dyn ConnectionHandle>)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            warn!(user_id = %user, error = %e, "registration rejected, dropping socket");
            return;
        }
    };
    counter!(crate::metrics::WS_CONNECTIONS_TOTAL).increment(1);
    info!(session_id = %session, user_id = %user, "socket connected");

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound_rx));
    read_loop(&state, &session, stream).await;

    conn.mark_closed();
    let _ = state.coordinator.unregister(&session).await;
    counter!(crate::metrics::WS_DISCONNECTIONS_TOTAL).increment(1);
    writer.abort();
    info!(session_id = %session, user_id = %user, "socket closed");
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(text) => {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Outbound::Close(reason) => {
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code(reason),
                        reason: reason.as_str().into(),
                    })))
                    .await;
                break;
            }
        }
    }
}

async fn read_loop(state: &AppState, session: &SessionId, mut stream: SplitStream<WebSocket>) {
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                if is_heartbeat(&text) {
                    state.coordinator.on_heartbeat(session).await;
                } else {
                    debug!(session_id = %session, "dropping non-heartbeat inbound frame");
                }
            }
            Message::Close(_) => break,
            // Ping/pong handled by the protocol layer; binary is not part
            // of the envelope contract.
            _ => {}
        }
    }
}

/// Map close reasons onto WebSocket close codes (4xxx = application).
fn close_code(reason: CloseReason) -> u16 {
    match reason {
        CloseReason::ServerError => 1011,
        CloseReason::Restarting => 1001,
        CloseReason::NotReliable => 4000,
        CloseReason::Kicked => 4001,
    }
}

fn is_heartbeat(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| value.get("type").and_then(|t| t.as_str().map(String::from)))
        .is_some_and(|t| t == "heartbeat")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_frame_is_recognized() {
        assert!(is_heartbeat(r#"{"type":"heartbeat"}"#));
        assert!(is_heartbeat(r#"{"type":"heartbeat","seq":42}"#));
    }

    #[test]
    fn other_frames_are_not_heartbeats() {
        assert!(!is_heartbeat(r#"{"type":"chat","text":"hi"}"#));
        assert!(!is_heartbeat("not json"));
        assert!(!is_heartbeat(""));
        assert!(!is_heartbeat(r#"{"kind":"heartbeat"}"#));
    }

    #[test]
    fn close_codes_are_distinct() {
        let codes = [
            close_code(CloseReason::ServerError),
            close_code(CloseReason::Restarting),
            close_code(CloseReason::NotReliable),
            close_code(CloseReason::Kicked),
        ];
        let unique: std::collections::HashSet<u16> = codes.into_iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
