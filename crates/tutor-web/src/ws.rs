//! WebSocket upgrade handler and message dispatch.
//!
//! Each client connects to one session at `/ws/{id}` and receives:
//! 1. A full [`SessionSnapshot`](crate::snapshot::SessionSnapshot) on connect.
//! 2. Incremental [`WsMessage`] updates as turns complete.
//!
//! Clients send `chat`, `select` and `reset` messages back.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::broadcast::WsMessage;
use crate::session::SharedSession;

/// A message received from a WebSocket client.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Chat { message: String },
    Select { category: String, option: String },
    Reset,
}

/// GET /ws/{id}: WebSocket upgrade handler. 404 for unknown sessions.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = app.session(id)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session)))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, session: SharedSession) {
    let (mut sink, mut stream) = socket.split();

    // Subscribe before taking the snapshot so nothing falls in between.
    let (snapshot_msg, mut broadcast_rx, id) = {
        let s = session.lock().await;
        (snapshot_message(&s), s.subscribe(), s.id())
    };
    if ws_send(&mut sink, &snapshot_msg).await.is_err() {
        return;
    }

    debug!("WebSocket client connected to session {id}");

    // Forward session broadcasts to this client.
    let session_for_resync = session.clone();
    let forward_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if ws_send(&mut sink, &msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged by {n} messages, resending snapshot");
                    let msg = snapshot_message(&*session_for_resync.lock().await);
                    if ws_send(&mut sink, &msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => handle_client_message(&text, &session).await,
            Message::Close(_) => break,
            _ => {} // Ignore binary, ping, pong.
        }
    }

    debug!("WebSocket client disconnected from session {id}");
    forward_task.abort();
}

/// Process a JSON message received from a client.
///
/// Results and failures reach the client through the session broadcast.
async fn handle_client_message(text: &str, session: &SharedSession) {
    let Ok(msg) = serde_json::from_str::<ClientMessage>(text) else {
        debug!("Ignoring malformed WebSocket message");
        return;
    };

    let mut s = session.lock().await;
    let result = match msg {
        ClientMessage::Chat { message } => s.chat(&message).await.map(drop),
        ClientMessage::Select { category, option } => s.select(&category, &option),
        ClientMessage::Reset => s.reset().await.map(drop),
    };
    if let Err(e) = result {
        debug!("WebSocket request on session {} failed: {e}", s.id());
    }
}

fn snapshot_message(session: &crate::session::Session) -> WsMessage {
    WsMessage::Snapshot {
        data: serde_json::to_value(session.snapshot()).unwrap_or_default(),
    }
}

/// Serialize a `WsMessage` and send it over the WebSocket sink.
async fn ws_send(sink: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).unwrap_or_default();
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}
