//! Shared relay state: one room per `(session, channel)` scope.

use crate::config::ServerConfig;
use dashmap::DashMap;
use inkboard_core::{DrawEvent, Scope, ServerMessage};
use std::collections::HashSet;
use tokio::sync::broadcast;
use tracing::debug;

pub type RoomSender = broadcast::Sender<(String, ServerMessage)>;
pub type RoomReceiver = broadcast::Receiver<(String, ServerMessage)>;

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: RoomSender,
    /// Connected peer IDs
    peers: HashSet<String>,
    /// Stored events handed to new joiners
    history: Vec<DrawEvent>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: HashSet::new(),
            history: Vec::new(),
        }
    }
}

/// What a joining peer receives.
pub struct JoinTicket {
    pub rx: RoomReceiver,
    pub history: Vec<DrawEvent>,
    pub peer_count: usize,
}

/// Shared application state
pub struct AppState {
    rooms: DashMap<String, Room>,
    config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
        }
    }

    /// Add a peer to a scope's room, creating it on first use.
    pub fn join_room(&self, scope: &Scope, peer_id: &str) -> JoinTicket {
        let mut room = self
            .rooms
            .entry(scope.key())
            .or_insert_with(|| Room::new(self.config.channel_capacity));
        room.peers.insert(peer_id.to_string());
        JoinTicket {
            rx: room.tx.subscribe(),
            history: room.history.clone(),
            peer_count: room.peers.len(),
        }
    }

    /// Remove a peer. Rooms with no peers and no history are dropped.
    pub fn leave_room(&self, scope: &Scope, peer_id: &str) {
        let key = scope.key();
        if let Some(mut room) = self.rooms.get_mut(&key) {
            room.peers.remove(peer_id);
            if room.peers.is_empty() && room.history.is_empty() {
                drop(room);
                self.rooms.remove(&key);
            }
        }
    }

    /// Store a published event and relay it to the scope's peers.
    ///
    /// Text events are client-local and dropped. Previews are relayed but not
    /// stored. `clear` empties the stored history and is relayed. Storing and
    /// sending happen under one room lock, so history order is relay order.
    /// Returns whether the event was relayed.
    pub fn publish(&self, scope: &Scope, from: &str, event: DrawEvent) -> bool {
        if event.is_local_only() {
            debug!("Dropping client-local {} event for {}", event.kind(), scope);
            return false;
        }

        let mut room = self
            .rooms
            .entry(scope.key())
            .or_insert_with(|| Room::new(self.config.channel_capacity));
        if matches!(event, DrawEvent::Clear) {
            room.history.clear();
        } else if !event.is_preview() {
            room.history.push(event.clone());
        }
        let msg = ServerMessage::Draw {
            from: from.to_string(),
            event,
        };
        let _ = room.tx.send((from.to_string(), msg));
        true
    }

    /// Stored history of a scope, oldest first.
    pub fn history(&self, scope: &Scope) -> Vec<DrawEvent> {
        self.rooms
            .get(&scope.key())
            .map(|room| room.history.clone())
            .unwrap_or_default()
    }

    /// Broadcast message to a scope's room
    pub fn broadcast(&self, scope: &Scope, from: &str, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&scope.key()) {
            let _ = room.tx.send((from.to_string(), msg));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkboard_core::{DrawPayload, replay};
    use kurbo::{Point, Vec2};

    fn state() -> AppState {
        AppState::new(ServerConfig::default())
    }

    fn seg(n: f64) -> DrawEvent {
        DrawEvent::stroke(Point::new(n, 0.0), Point::new(n + 1.0, 0.0), "#000", 2.0)
    }

    fn draw_of(msg: ServerMessage) -> DrawEvent {
        match msg {
            ServerMessage::Draw { event, .. } => event,
            other => panic!("expected draw, got {:?}", other),
        }
    }

    #[test]
    fn test_publish_stores_and_relays() {
        let state = state();
        let scope = Scope::new("s", "c");
        let mut ticket = state.join_room(&scope, "p1");
        assert!(state.publish(&scope, "p2", seg(0.0)));
        assert_eq!(state.history(&scope), vec![seg(0.0)]);

        let (from, msg) = ticket.rx.try_recv().unwrap();
        assert_eq!(from, "p2");
        assert_eq!(draw_of(msg), seg(0.0));
    }

    #[test]
    fn test_relay_order_matches_history() {
        let state = state();
        let scope = Scope::new("s", "c");
        let mut ticket = state.join_room(&scope, "watcher");
        for n in 0..4 {
            let from = if n % 2 == 0 { "p1" } else { "p2" };
            state.publish(&scope, from, seg(n as f64));
        }
        let relayed: Vec<DrawEvent> = (0..4)
            .map(|_| draw_of(ticket.rx.try_recv().unwrap().1))
            .collect();
        assert_eq!(relayed, state.history(&scope));
    }

    #[test]
    fn test_joiner_does_not_receive_history_twice() {
        let state = state();
        let scope = Scope::new("s", "c");
        state.publish(&scope, "p1", seg(0.0));
        let mut ticket = state.join_room(&scope, "p2");
        assert_eq!(ticket.history, vec![seg(0.0)]);
        assert!(ticket.rx.try_recv().is_err());
    }

    #[test]
    fn test_text_is_dropped() {
        let state = state();
        let scope = Scope::new("s", "c");
        let text = DrawEvent::text("t", "hi", Point::ZERO, "", 20.0);
        assert!(!state.publish(&scope, "p1", text));
        assert!(state.history(&scope).is_empty());
    }

    #[test]
    fn test_preview_is_relayed_not_stored() {
        let state = state();
        let scope = Scope::new("s", "c");
        let preview = DrawEvent::Preview(DrawPayload {
            kind: "shape-preview-line".to_string(),
            ..Default::default()
        });
        assert!(state.publish(&scope, "p1", preview));
        assert!(state.history(&scope).is_empty());
    }

    #[test]
    fn test_clear_empties_history() {
        let state = state();
        let scope = Scope::new("s", "c");
        state.publish(&scope, "p1", seg(0.0));
        assert!(state.publish(&scope, "p1", DrawEvent::Clear));
        assert!(state.history(&scope).is_empty());
    }

    #[test]
    fn test_history_keeps_moved_shapes_reachable() {
        let state = state();
        let scope = Scope::new("s", "c");
        let rect = DrawEvent::rect(Point::new(0.0, 0.0), Point::new(20.0, 20.0), "#000", 2.0);
        state.publish(&scope, "p1", rect);
        let nudge =
            DrawEvent::move_rect(Point::new(-50.0, -50.0), Point::new(100.0, 100.0), Vec2::new(5.0, 5.0));
        for _ in 0..3 {
            state.publish(&scope, "p1", nudge.clone());
        }
        let history = state.history(&scope);
        assert_eq!(history.len(), 4);
        let shapes = replay(&history);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].primitive().unwrap().p1, Point::new(15.0, 15.0));
    }

    #[test]
    fn test_scopes_are_independent() {
        let state = state();
        state.publish(&Scope::new("s", "a"), "p1", seg(0.0));
        assert!(state.history(&Scope::new("s", "b")).is_empty());
        assert!(state.history(&Scope::new("t", "a")).is_empty());
    }

    #[test]
    fn test_join_returns_history_and_count() {
        let state = state();
        let scope = Scope::new("s", "c");
        state.publish(&scope, "p1", seg(0.0));
        let first = state.join_room(&scope, "p1");
        assert_eq!(first.peer_count, 1);
        assert_eq!(first.history, vec![seg(0.0)]);
        let second = state.join_room(&scope, "p2");
        assert_eq!(second.peer_count, 2);
    }

    #[test]
    fn test_broadcast_reaches_subscribers() {
        let state = state();
        let scope = Scope::new("s", "c");
        let mut ticket = state.join_room(&scope, "p1");
        state.broadcast(
            &scope,
            "p2",
            ServerMessage::PeerJoined {
                peer_id: "p2".to_string(),
            },
        );
        let (from, msg) = ticket.rx.try_recv().unwrap();
        assert_eq!(from, "p2");
        assert!(matches!(msg, ServerMessage::PeerJoined { .. }));
    }

    #[test]
    fn test_leave_keeps_rooms_with_history() {
        let state = state();
        let empty = Scope::new("s", "empty");
        let drawn = Scope::new("s", "drawn");
        state.join_room(&empty, "p1");
        state.join_room(&drawn, "p1");
        state.publish(&drawn, "p1", seg(0.0));
        state.leave_room(&empty, "p1");
        state.leave_room(&drawn, "p1");
        assert!(!state.rooms.contains_key(&empty.key()));
        assert_eq!(state.history(&drawn).len(), 1);
    }
}
