//! WebSocket endpoint for day-stream requests
//!
//! Implements GET /ws with:
//! - `get_day`: unfiltered stream of one calendar day
//! - `get_day_visual`: backward multi-day visual-content search
//! - Explicit rejection of malformed requests without dropping the connection
//! - At most one producing stream per connection, older streams superseded

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, instrument, warn};

use crate::day::DayWindow;
use crate::metrics;
use crate::protocol::{ClientRequest, ServerMessage};
use crate::session::StreamSessions;
use crate::stream::{search_visual_days, stream_day, StreamContext, StreamMode};

const CHANNEL_BUFFER_SIZE: usize = 32;

/// State the WebSocket route needs, derived from the app state via FromRef
#[derive(Clone)]
pub struct WsState {
    pub ctx: StreamContext,
    pub sessions: StreamSessions,
}

/// GET /ws - upgrade and serve a client connection
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[instrument(skip(socket, state))]
async fn handle_socket(socket: WebSocket, state: WsState) {
    let conn_id = state.sessions.next_conn_id();
    metrics::ws_client_connected();
    info!(conn_id, "Client connected");

    let (mut sink, mut source) = socket.split();

    // All streams for this connection produce into one outbound channel; a
    // single writer task owns the socket sink.
    let (out_tx, out_rx) = mpsc::channel::<ServerMessage>(CHANNEL_BUFFER_SIZE);

    let writer = tokio::spawn(async move {
        let mut messages = ReceiverStream::new(out_rx);
        while let Some(message) = messages.next().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = source.next().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                debug!(conn_id, error = %e, "WebSocket read error");
                break;
            }
        };

        match message {
            Message::Text(text) => handle_request(&state, conn_id, &text, &out_tx).await,
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of the protocol.
            _ => {}
        }
    }

    state.sessions.close(conn_id).await;
    drop(out_tx);
    writer.abort();
    metrics::ws_client_disconnected();
    info!(conn_id, "Client disconnected");
}

/// Parse and dispatch one client request
///
/// Malformed JSON, unknown types, and invalid dates get an `error` reply; the
/// connection stays open.
async fn handle_request(
    state: &WsState,
    conn_id: u64,
    text: &str,
    out: &mpsc::Sender<ServerMessage>,
) {
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => {
            warn!(conn_id, error = %e, "Malformed client request");
            let _ = out
                .send(ServerMessage::error(format!("Invalid request: {}", e)))
                .await;
            return;
        }
    };

    let (date, visual) = match &request {
        ClientRequest::GetDay { date } => (date, false),
        ClientRequest::GetDayVisual { date } => (date, true),
    };

    let window = match DayWindow::parse(date) {
        Ok(window) => window,
        Err(e) => {
            warn!(conn_id, date = %date, "Rejected request with invalid date");
            let _ = out.send(ServerMessage::error(e.to_string())).await;
            return;
        }
    };

    info!(conn_id, day = %window, visual, "Starting day stream");

    // Supersede any stream already running for this connection.
    let token = state.sessions.begin(conn_id).await;
    let ctx = state.ctx.clone();
    let out = out.clone();

    tokio::spawn(async move {
        let result = if visual {
            search_visual_days(&ctx, window, &token, &out).await
        } else {
            stream_day(&ctx, window, StreamMode::Full, &token, &out)
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            warn!(conn_id, day = %window, error = %e, "Day stream ended with error");
        } else {
            info!(conn_id, day = %window, "Day stream finished");
        }
    });
}
