//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::relay::ConnectionHandle;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn, outbound_rx) = ConnectionHandle::new();
    let conn_id = conn.id;
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    let limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    run_session(&state, &conn, ws_sink, ws_stream, outbound_rx, limiter).await;

    // Cleanup on disconnect
    state.relay.on_disconnect(conn_id);

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    state: &AppState,
    conn: &ConnectionHandle,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMsg>,
    rate_limiter: ConnectionRateLimiter,
) {
    // Spawn writer task: relay -> WebSocket
    let writer_conn_id = conn.id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> relay, one message at a time
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match ClientMsg::decode(&text) {
                // Key frames always pass: dropping one would leave the two
                // simulations disagreeing about which keys are held.
                Ok(msg) if !msg.is_key_event() && !rate_limiter.check_command() => {
                    warn!(conn_id = %conn.id, "Rate limited session command");
                }
                Ok(msg) => state.relay.handle(conn, msg),
                Err(e) => {
                    warn!(conn_id = %conn.id, error = %e, "Failed to parse client message");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(conn_id = %conn.id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                debug!(conn_id = %conn.id, "Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!(conn_id = %conn.id, "Received pong");
            }
            Ok(Message::Close(_)) => {
                info!(conn_id = %conn.id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(conn_id = %conn.id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = msg.encode().map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}
