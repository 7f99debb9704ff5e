//! WebSocket upgrade handler

use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{InboundMessage, UserId, WorldInput};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::ClientMsg;

/// Outbound frames buffered per connection before sends start dropping
const OUTBOUND_BUFFER: usize = 256;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.connections.is_full() {
        warn!(
            max_players = state.config.max_players,
            "Refusing WebSocket upgrade, server is full"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Server is full").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

    let Some(user_id) = state.connections.register(outbound_tx) else {
        warn!(%connection_id, "No free user slot, closing connection");
        return;
    };
    info!(%connection_id, user_id, "New WebSocket connection");

    if state
        .world_tx
        .send(WorldInput::Connected { user_id })
        .await
        .is_err()
    {
        error!(%connection_id, user_id, "World loop is not running");
        state.connections.unregister(user_id);
        return;
    }

    let (ws_sink, ws_stream) = socket.split();
    run_session(user_id, ws_sink, ws_stream, outbound_rx, &state.world_tx).await;

    // Cleanup on disconnect
    if !notify_disconnect(&state.world_tx, user_id).await {
        warn!(%connection_id, user_id, "World loop is gone, disconnect not delivered");
    }
    state.connections.unregister(user_id);

    info!(%connection_id, user_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    user_id: UserId,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<Message>,
    world_tx: &mpsc::Sender<WorldInput>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Spawn writer task: world output -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(msg).await {
                debug!(user_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> world task
    while let Some(result) = ws_stream.next().await {
        let raw = match result {
            Ok(Message::Text(text)) => Bytes::from(text.into_bytes()),
            Ok(Message::Binary(data)) => Bytes::from(data),
            Ok(Message::Ping(_)) => {
                debug!(user_id, "Received ping");
                continue;
            }
            Ok(Message::Pong(_)) => {
                debug!(user_id, "Received pong");
                continue;
            }
            Ok(Message::Close(_)) => {
                info!(user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id, error = %e, "WebSocket error");
                break;
            }
        };

        if !rate_limiter.check_input() {
            warn!(user_id, "Rate limited input message");
            continue;
        }

        let Some(input) = decode_inbound(user_id, raw, Instant::now()) else {
            continue;
        };
        if world_tx.send(WorldInput::Message(input)).await.is_err() {
            debug!(user_id, "World input channel closed");
            break;
        }
    }

    // Abort writer task
    writer_handle.abort();
}

/// Tell the world task the user left. False when the world task is gone.
async fn notify_disconnect(world_tx: &mpsc::Sender<WorldInput>, user_id: UserId) -> bool {
    world_tx
        .send(WorldInput::Disconnected { user_id })
        .await
        .is_ok()
}

/// Parse one frame, keeping its bytes for unmodified relays
fn decode_inbound(user_id: UserId, raw: Bytes, received_at: Instant) -> Option<InboundMessage> {
    match serde_json::from_slice::<ClientMsg>(&raw) {
        Ok(msg) => Some(InboundMessage {
            user_id,
            msg,
            raw,
            received_at,
        }),
        Err(e) => {
            warn!(user_id, error = %e, "Failed to parse client message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_keep_their_raw_bytes() {
        let raw = Bytes::from_static(br#"{"t":"customPacket","content":{"a":1}}"#);
        let now = Instant::now();
        let input = decode_inbound(4, raw.clone(), now).unwrap();
        assert_eq!(input.user_id, 4);
        assert_eq!(input.raw, raw);
        assert_eq!(input.received_at, now);
        assert_eq!(input.msg.kind(), "customPacket");
    }

    #[test]
    fn unknown_kinds_still_reach_the_world() {
        let raw = Bytes::from_static(br#"{"t":"somethingNew","x":1}"#);
        let input = decode_inbound(1, raw, Instant::now()).unwrap();
        assert!(matches!(input.msg, ClientMsg::Unknown));
    }

    #[tokio::test]
    async fn disconnect_reports_a_stopped_world() {
        let (world_tx, mut world_rx) = mpsc::channel(1);
        assert!(notify_disconnect(&world_tx, 7).await);
        assert!(matches!(
            world_rx.recv().await,
            Some(WorldInput::Disconnected { user_id: 7 })
        ));

        drop(world_rx);
        assert!(!notify_disconnect(&world_tx, 7).await);
    }

    #[test]
    fn malformed_frames_are_dropped() {
        assert!(decode_inbound(1, Bytes::from_static(b"not json"), Instant::now()).is_none());
        assert!(decode_inbound(1, Bytes::from_static(br#"{"x":1}"#), Instant::now()).is_none());
    }
}
