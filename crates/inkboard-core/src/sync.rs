//! Relay protocol and WebSocket client.
//!
//! Clients join a `(session, channel)` scope and exchange draw events through
//! the relay server. The server replies to a join with the scope's stored
//! history so a newcomer can reconcile its local log.

use crate::event::DrawEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A `(session, channel)` pair. Each scope has its own independent log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub session: String,
    pub channel: String,
}

impl Scope {
    pub fn new(session: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            channel: channel.into(),
        }
    }

    /// Stable string key, `session/channel`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.session, self.channel)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.channel)
    }
}

/// Messages sent to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a scope, leaving any previous one
    Join { session: String, channel: String },
    /// Leave the current scope
    Leave,
    /// Publish a draw event to the current scope
    Draw { event: DrawEvent },
}

/// Messages received from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirm a join with the scope's stored history
    Joined {
        session: String,
        channel: String,
        peer_count: usize,
        #[serde(default)]
        history: Vec<DrawEvent>,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// Draw event from another peer
    Draw { from: String, event: DrawEvent },
    Error { message: String },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// Joined a scope; `history` is the server-confirmed log
    Joined {
        scope: Scope,
        peer_count: usize,
        history: Vec<DrawEvent>,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// Draw event from another peer
    Draw { from: String, event: DrawEvent },
    Error { message: String },
}

impl From<ServerMessage> for SyncEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Joined {
                session,
                channel,
                peer_count,
                history,
            } => SyncEvent::Joined {
                scope: Scope { session, channel },
                peer_count,
                history,
            },
            ServerMessage::PeerJoined { peer_id } => SyncEvent::PeerJoined { peer_id },
            ServerMessage::PeerLeft { peer_id } => SyncEvent::PeerLeft { peer_id },
            ServerMessage::Draw { from, event } => SyncEvent::Draw { from, event },
            ServerMessage::Error { message } => SyncEvent::Error { message },
        }
    }
}

/// Errors from the sync client.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid WebSocket URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Something that can deliver draw events to the other participants.
pub trait Publisher {
    fn publish(&mut self, event: &DrawEvent) -> Result<(), SyncError>;
}

/// Collects published events in memory.
impl Publisher for Vec<DrawEvent> {
    fn publish(&mut self, event: &DrawEvent) -> Result<(), SyncError> {
        self.push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Native WebSocket Client
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    fn preview(text: &str) -> &str {
        let end = text
            .char_indices()
            .nth(100)
            .map_or(text.len(), |(index, _)| index);
        &text[..end]
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<SyncEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected WebSocket client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay server at a `ws://` or `wss://` URL.
        pub fn connect(&mut self, url: &str) -> Result<(), SyncError> {
            if self.cmd_tx.is_some() {
                return Err(SyncError::AlreadyConnected);
            }

            let parsed_url = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(SyncError::UnsupportedScheme(parsed_url.scheme().to_string()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();

            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("WebSocket thread: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(connected) => connected,
                    Err(e) => {
                        log::error!("WebSocket connection failed: {}", e);
                        let _ = event_tx.send(SyncEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                        return;
                    }
                };
                log::info!("WebSocket connected, status: {}", response.status());
                let _ = event_tx.send(SyncEvent::Connected);

                // Short read timeout so the loop can service outgoing commands.
                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            log::debug!("WebSocket sending: {}", preview(&msg));
                            if let Err(e) = socket.send(Message::Text(msg)) {
                                log::error!("WebSocket send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            log::info!("WebSocket close requested");
                            let _ = socket.close(None);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => {
                            log::info!("WebSocket command channel disconnected");
                            break;
                        }
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(txt)) => {
                            log::debug!("WebSocket received: {}", preview(&txt));
                            match serde_json::from_str::<ServerMessage>(&txt) {
                                Ok(server_msg) => {
                                    let _ = event_tx.send(server_msg.into());
                                }
                                Err(e) => log::warn!("Failed to parse server message: {}", e),
                            }
                        }
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(_)) => {
                            log::info!("WebSocket received close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::error!("WebSocket read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("WebSocket thread exiting");
                let _ = event_tx.send(SyncEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);

            Ok(())
        }

        /// Disconnect from the server.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Send a protocol message.
        pub fn send(&self, msg: &ClientMessage) -> Result<(), SyncError> {
            let tx = self.cmd_tx.as_ref().ok_or(SyncError::NotConnected)?;
            let json = serde_json::to_string(msg)?;
            tx.send(WsCommand::Send(json))
                .map_err(|e| SyncError::SendFailed(e.to_string()))
        }

        pub fn join(&self, scope: &Scope) -> Result<(), SyncError> {
            self.send(&ClientMessage::Join {
                session: scope.session.clone(),
                channel: scope.channel.clone(),
            })
        }

        pub fn leave(&self) -> Result<(), SyncError> {
            self.send(&ClientMessage::Leave)
        }

        /// Poll for pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SyncEvent::Connected => self.state = ConnectionState::Connected,
                        SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        SyncEvent::Error { .. } => self.state = ConnectionState::Error,
                        _ => {}
                    }
                    self.events.push(event);
                }
            }

            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Publisher for NativeWebSocket {
        fn publish(&mut self, event: &DrawEvent) -> Result<(), SyncError> {
            self.send(&ClientMessage::Draw {
                event: event.clone(),
            })
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;
