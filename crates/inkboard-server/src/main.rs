//! Inkboard WebSocket Relay Server
//!
//! Relays draw events between clients working in the same
//! `(session, channel)` scope and keeps each scope's history in memory for
//! late joiners.
//!
//! ## Protocol
//!
//! Messages are JSON with the following format:
//! ```json
//! { "type": "join", "session": "s1", "channel": "main" }
//! { "type": "draw", "event": { "type": "stroke-segment", "x1": 0, "y1": 0, "x2": 4, "y2": 4 } }
//! { "type": "leave" }
//! ```

mod config;
mod state;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use config::ServerConfig;
use futures_util::{SinkExt, StreamExt};
use inkboard_core::{ClientMessage, DrawEvent, Scope, ServerMessage};
use state::{AppState, RoomReceiver};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let addr = config.addr;
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route(
            "/api/sessions/{session}/channels/{channel}/shapes",
            get(history_handler),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Inkboard relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    axum::serve(listener, app).await
}

/// Index page
async fn index() -> &'static str {
    "Inkboard Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Stored history of a scope as a JSON array of draw events.
async fn history_handler(
    Path((session, channel)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<DrawEvent>> {
    Json(state.history(&Scope::new(session, channel)))
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            error!("Failed to encode server message: {}", e);
            None
        }
    }
}

fn leave(state: &AppState, scope: &Scope, peer_id: &str) {
    state.leave_room(scope, peer_id);
    state.broadcast(
        scope,
        peer_id,
        ServerMessage::PeerLeft {
            peer_id: peer_id.to_string(),
        },
    );
    info!("Peer {} left {}", peer_id, scope);
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_scope: Option<Scope> = None;
    let mut room_rx: Option<RoomReceiver> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };

                let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => client_msg,
                    Err(e) => {
                        warn!("Invalid message from {}: {}", peer_id, e);
                        let err = ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        };
                        if let Some(reply) = encode(&err) {
                            let _ = sender.send(reply).await;
                        }
                        continue;
                    }
                };

                match client_msg {
                    ClientMessage::Join { session, channel } => {
                        if let Some(old) = current_scope.take() {
                            leave(&state, &old, &peer_id);
                        }

                        let scope = Scope::new(session, channel);
                        let ticket = state.join_room(&scope, &peer_id);
                        room_rx = Some(ticket.rx);

                        let joined = ServerMessage::Joined {
                            session: scope.session.clone(),
                            channel: scope.channel.clone(),
                            peer_count: ticket.peer_count,
                            history: ticket.history,
                        };
                        if let Some(reply) = encode(&joined) {
                            if sender.send(reply).await.is_err() {
                                break;
                            }
                        }

                        state.broadcast(&scope, &peer_id, ServerMessage::PeerJoined {
                            peer_id: peer_id.clone(),
                        });
                        info!("Peer {} joined {}", peer_id, scope);
                        current_scope = Some(scope);
                    }
                    ClientMessage::Leave => {
                        if let Some(old) = current_scope.take() {
                            leave(&state, &old, &peer_id);
                        }
                        room_rx = None;
                    }
                    ClientMessage::Draw { event } => {
                        let Some(scope) = current_scope.as_ref() else {
                            let err = ServerMessage::Error {
                                message: "Join a session before drawing".to_string(),
                            };
                            if let Some(reply) = encode(&err) {
                                let _ = sender.send(reply).await;
                            }
                            continue;
                        };
                        let kind = event.kind().to_string();
                        if state.publish(scope, &peer_id, event) {
                            debug!("Relayed {} from {} in {}", kind, peer_id, scope);
                        }
                    }
                }
            }

            msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => std::future::pending::<Option<(String, ServerMessage)>>().await,
                }
            } => {
                if let Some((from, server_msg)) = msg {
                    // Don't echo back to sender
                    if from != peer_id {
                        if let Some(out) = encode(&server_msg) {
                            if sender.send(out).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    if let Some(scope) = current_scope {
        leave(&state, &scope, &peer_id);
    }
    info!("Connection closed: {}", peer_id);
}
