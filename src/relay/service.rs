//! Relay service - pairs two players per session and forwards their inputs
//!
//! All registry mutation goes through [`Relay::handle`] and
//! [`Relay::on_disconnect`], each of which holds the state lock for the whole
//! message. Outbound sends are non-blocking channel pushes, so the lock is
//! never held across an await point.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::{ClientMsg, KeyEvent, PlayerSlot, ServerMsg, Session, SessionRequest};

use super::store::{InMemorySessionStore, SessionStore};

pub type ConnectionId = Uuid;

/// Outbound half of one client connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMsg>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiver its writer task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Fire-and-forget send. Returns false if the connection is gone.
    pub fn send(&self, msg: ServerMsg) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Relay routing failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session {0} is full")]
    SessionFull(String),

    #[error("Player {player_id} is not part of session {game_id}")]
    NotAMember { game_id: String, player_id: String },

    #[error("Player {player_id} already holds a slot in session {game_id}")]
    AlreadyJoined { game_id: String, player_id: String },

    #[error("Session {0} has no opponent connected")]
    NoOpponent(String),

    #[error("Player {0} is registered from another connection")]
    WrongConnection(String),
}

struct RelayState<S> {
    sessions: S,
    /// Player id -> connection it last created/joined from
    connections: HashMap<String, ConnectionHandle>,
}

impl<S: SessionStore> RelayState<S> {
    fn send_to(&self, player_id: &str, msg: ServerMsg) {
        match self.connections.get(player_id) {
            Some(conn) => {
                if !conn.send(msg) {
                    debug!(player_id = %player_id, "Connection closed, message dropped");
                }
            }
            None => debug!(player_id = %player_id, "No connection registered"),
        }
    }

    fn broadcast(&self, session: &Session, msg: ServerMsg) {
        for player_id in session.player_ids() {
            self.send_to(player_id, msg.clone());
        }
    }

    fn create(&mut self, conn: &ConnectionHandle, req: SessionRequest) {
        let session = Session::new(req.game_id.clone(), req.player_id.clone());

        if let Some(previous) = self.sessions.insert(session.clone()) {
            warn!(
                game_id = %req.game_id,
                previous_host = %previous.player1.id,
                "Duplicate create, previous session overwritten"
            );
        }
        self.connections.insert(req.player_id.clone(), conn.clone());

        conn.send(ServerMsg::GameCreated(session));
        info!(game_id = %req.game_id, player_id = %req.player_id, "Game created");
    }

    fn join(&mut self, conn: &ConnectionHandle, req: SessionRequest) -> Result<Session, RelayError> {
        let session = self
            .sessions
            .get_mut(&req.game_id)
            .ok_or_else(|| RelayError::SessionNotFound(req.game_id.clone()))?;

        if session.is_full() {
            return Err(RelayError::SessionFull(req.game_id));
        }
        if session.has_player(&req.player_id) {
            return Err(RelayError::AlreadyJoined {
                game_id: req.game_id,
                player_id: req.player_id,
            });
        }

        session.player2 = Some(PlayerSlot::new(req.player_id.clone()));
        let session = session.clone();
        self.connections.insert(req.player_id.clone(), conn.clone());

        self.broadcast(&session, ServerMsg::PlayerJoined(session.clone()));
        info!(game_id = %req.game_id, player_id = %req.player_id, "Player joined");
        Ok(session)
    }

    fn ready(&mut self, req: SessionRequest) -> Result<(), RelayError> {
        let session = self
            .sessions
            .get_mut(&req.game_id)
            .ok_or_else(|| RelayError::SessionNotFound(req.game_id.clone()))?;

        let slot = session
            .slot_mut(&req.player_id)
            .ok_or_else(|| RelayError::NotAMember {
                game_id: req.game_id.clone(),
                player_id: req.player_id.clone(),
            })?;
        slot.ready = true;

        let start = session.all_ready() && !session.started;
        if start {
            session.started = true;
        }
        let session = session.clone();

        self.broadcast(&session, ServerMsg::PlayerReady(session.clone()));
        debug!(game_id = %req.game_id, player_id = %req.player_id, "Player ready");

        if start {
            self.broadcast(&session, ServerMsg::GameStart(session.clone()));
            info!(game_id = %req.game_id, "Game started");
        }
        Ok(())
    }

    /// Forward a key event to the sender's opponent, never back to the sender.
    /// The event must carry the player id registered for `conn`.
    fn route_key(
        &self,
        conn: &ConnectionHandle,
        event: KeyEvent,
        pressed: bool,
    ) -> Result<(), RelayError> {
        let session = self
            .sessions
            .get(&event.game_id)
            .ok_or_else(|| RelayError::SessionNotFound(event.game_id.clone()))?;

        if !session.has_player(&event.player_id) {
            return Err(RelayError::NotAMember {
                game_id: event.game_id.clone(),
                player_id: event.player_id.clone(),
            });
        }
        let owner = self.connections.get(&event.player_id).map(|c| c.id);
        if owner != Some(conn.id) {
            return Err(RelayError::WrongConnection(event.player_id.clone()));
        }
        let opponent = session
            .opponent_of(&event.player_id)
            .ok_or_else(|| RelayError::NoOpponent(event.game_id.clone()))?;

        let opponent_id = opponent.id.clone();
        let msg = if pressed {
            ServerMsg::PlayerKeyPress(event)
        } else {
            ServerMsg::PlayerKeyRelease(event)
        };
        self.send_to(&opponent_id, msg);
        Ok(())
    }
}

/// The relay: session registry plus connection registry
pub struct Relay<S: SessionStore = InMemorySessionStore> {
    state: Mutex<RelayState<S>>,
}

impl Relay<InMemorySessionStore> {
    pub fn new() -> Self {
        Self::with_store(InMemorySessionStore::new())
    }
}

impl Default for Relay<InMemorySessionStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SessionStore> Relay<S> {
    pub fn with_store(sessions: S) -> Self {
        Self {
            state: Mutex::new(RelayState {
                sessions,
                connections: HashMap::new(),
            }),
        }
    }

    /// Process one inbound command to completion
    pub fn handle(&self, conn: &ConnectionHandle, msg: ClientMsg) {
        let mut state = self.state.lock();

        match msg {
            ClientMsg::CreateGame(req) => state.create(conn, req),
            ClientMsg::JoinGame(req) => match state.join(conn, req) {
                Ok(_) => {}
                Err(RelayError::SessionNotFound(game_id)) => {
                    debug!(game_id = %game_id, "Join rejected, game not found");
                    conn.send(ServerMsg::GameNotFound {});
                }
                Err(RelayError::SessionFull(game_id)) => {
                    debug!(game_id = %game_id, "Join rejected, game full");
                    if let Some(session) = state.sessions.get(&game_id) {
                        conn.send(ServerMsg::GameFull(session.clone()));
                    }
                }
                Err(e) => warn!(conn_id = %conn.id, error = %e, "Join rejected"),
            },
            ClientMsg::Ready(req) => {
                if let Err(e) = state.ready(req) {
                    warn!(conn_id = %conn.id, error = %e, "Ready ignored");
                }
            }
            ClientMsg::KeyPress(event) => {
                if let Err(e) = state.route_key(conn, event, true) {
                    debug!(conn_id = %conn.id, error = %e, "Key press dropped");
                }
            }
            ClientMsg::KeyRelease(event) => {
                if let Err(e) = state.route_key(conn, event, false) {
                    debug!(conn_id = %conn.id, error = %e, "Key release dropped");
                }
            }
        }
    }

    /// Forget a closed connection. Sessions with no connected player left are
    /// removed.
    pub fn on_disconnect(&self, conn_id: ConnectionId) {
        let mut state = self.state.lock();

        let gone: Vec<String> = state
            .connections
            .iter()
            .filter(|(_, conn)| conn.id == conn_id)
            .map(|(player_id, _)| player_id.clone())
            .collect();

        for player_id in &gone {
            state.connections.remove(player_id);
        }

        let mut affected: Vec<String> = gone
            .iter()
            .flat_map(|player_id| state.sessions.sessions_of(player_id))
            .collect();
        affected.sort();
        affected.dedup();

        for game_id in affected {
            let orphaned = state.sessions.get(&game_id).is_some_and(|session| {
                session
                    .player_ids()
                    .all(|player_id| !state.connections.contains_key(player_id))
            });
            if orphaned {
                state.sessions.remove(&game_id);
                info!(game_id = %game_id, "Session removed, no players connected");
            }
        }

        if !gone.is_empty() {
            debug!(conn_id = %conn_id, players = gone.len(), "Connection unregistered");
        }
    }

    /// Drop a session explicitly
    pub fn remove_session(&self, game_id: &str) -> Option<Session> {
        self.state.lock().sessions.remove(game_id)
    }

    pub fn session(&self, game_id: &str) -> Option<Session> {
        self.state.lock().sessions.get(game_id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(game_id: &str, player_id: &str) -> SessionRequest {
        SessionRequest {
            game_id: game_id.into(),
            player_id: player_id.into(),
        }
    }

    fn key(game_id: &str, player_id: &str, key: &str) -> KeyEvent {
        KeyEvent {
            game_id: game_id.into(),
            player_id: player_id.into(),
            key: key.into(),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMsg>) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// Relay with a joined session `g1` (host `a`, guest `b`), inboxes drained
    fn paired() -> (
        Relay,
        ConnectionHandle,
        mpsc::UnboundedReceiver<ServerMsg>,
        ConnectionHandle,
        mpsc::UnboundedReceiver<ServerMsg>,
    ) {
        let relay = Relay::new();
        let (a, mut a_rx) = ConnectionHandle::new();
        let (b, mut b_rx) = ConnectionHandle::new();
        relay.handle(&a, ClientMsg::CreateGame(req("g1", "a")));
        relay.handle(&b, ClientMsg::JoinGame(req("g1", "b")));
        drain(&mut a_rx);
        drain(&mut b_rx);
        (relay, a, a_rx, b, b_rx)
    }

    #[test]
    fn test_create_acknowledges_host_only() {
        let relay = Relay::new();
        let (a, mut a_rx) = ConnectionHandle::new();

        relay.handle(&a, ClientMsg::CreateGame(req("g1", "a")));

        let msgs = drain(&mut a_rx);
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            ServerMsg::GameCreated(session) => {
                assert_eq!(session.game_id, "g1");
                assert_eq!(session.player1.id, "a");
                assert!(session.player2.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(relay.session_count(), 1);
    }

    #[test]
    fn test_duplicate_create_overwrites() {
        let relay = Relay::new();
        let (a, _a_rx) = ConnectionHandle::new();
        let (c, _c_rx) = ConnectionHandle::new();

        relay.handle(&a, ClientMsg::CreateGame(req("g1", "a")));
        relay.handle(&c, ClientMsg::CreateGame(req("g1", "c")));

        assert_eq!(relay.session("g1").unwrap().player1.id, "c");
        assert_eq!(relay.session_count(), 1);
    }

    #[test]
    fn test_join_broadcasts_to_both() {
        let relay = Relay::new();
        let (a, mut a_rx) = ConnectionHandle::new();
        let (b, mut b_rx) = ConnectionHandle::new();
        relay.handle(&a, ClientMsg::CreateGame(req("g1", "a")));
        drain(&mut a_rx);

        relay.handle(&b, ClientMsg::JoinGame(req("g1", "b")));

        for msgs in [drain(&mut a_rx), drain(&mut b_rx)] {
            assert_eq!(msgs.len(), 1);
            match &msgs[0] {
                ServerMsg::PlayerJoined(session) => {
                    assert_eq!(session.player2.as_ref().unwrap().id, "b");
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_join_unknown_game_replies_not_found() {
        let relay = Relay::new();
        let (b, mut b_rx) = ConnectionHandle::new();

        relay.handle(&b, ClientMsg::JoinGame(req("nope", "b")));

        assert_eq!(drain(&mut b_rx), vec![ServerMsg::GameNotFound {}]);
        assert_eq!(relay.connection_count(), 0);
    }

    #[test]
    fn test_join_full_game_is_rejected_without_mutation() {
        let (relay, _a, mut a_rx, _b, mut b_rx) = paired();
        let before = relay.session("g1").unwrap();
        let (c, mut c_rx) = ConnectionHandle::new();

        relay.handle(&c, ClientMsg::JoinGame(req("g1", "c")));

        let msgs = drain(&mut c_rx);
        assert_eq!(msgs, vec![ServerMsg::GameFull(before.clone())]);
        assert_eq!(relay.session("g1").unwrap(), before);
        assert!(drain(&mut a_rx).is_empty());
        assert!(drain(&mut b_rx).is_empty());
    }

    #[test]
    fn test_host_cannot_join_own_game() {
        let relay = Relay::new();
        let (a, mut a_rx) = ConnectionHandle::new();
        relay.handle(&a, ClientMsg::CreateGame(req("g1", "a")));
        drain(&mut a_rx);

        relay.handle(&a, ClientMsg::JoinGame(req("g1", "a")));

        assert!(relay.session("g1").unwrap().player2.is_none());
        assert!(drain(&mut a_rx).is_empty());
    }

    #[test]
    fn test_game_start_sent_once() {
        let (relay, a, mut a_rx, b, mut b_rx) = paired();

        relay.handle(&a, ClientMsg::Ready(req("g1", "a")));
        relay.handle(&b, ClientMsg::Ready(req("g1", "b")));
        relay.handle(&b, ClientMsg::Ready(req("g1", "b")));

        for msgs in [drain(&mut a_rx), drain(&mut b_rx)] {
            let starts = msgs
                .iter()
                .filter(|m| matches!(m, ServerMsg::GameStart(_)))
                .count();
            let readies = msgs
                .iter()
                .filter(|m| matches!(m, ServerMsg::PlayerReady(_)))
                .count();
            assert_eq!(starts, 1);
            assert_eq!(readies, 3);
            assert!(matches!(msgs.last(), Some(ServerMsg::PlayerReady(_))));
        }
    }

    #[test]
    fn test_single_ready_does_not_start() {
        let (relay, a, mut a_rx, _b, mut b_rx) = paired();

        relay.handle(&a, ClientMsg::Ready(req("g1", "a")));

        let msgs = drain(&mut b_rx);
        assert_eq!(msgs.len(), 1);
        match &msgs[0] {
            ServerMsg::PlayerReady(session) => {
                assert!(session.player1.ready);
                assert!(!session.player2.as_ref().unwrap().ready);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(drain(&mut a_rx).len(), 1);
    }

    #[test]
    fn test_key_press_goes_to_opponent_only() {
        let (relay, a, mut a_rx, _b, mut b_rx) = paired();

        relay.handle(&a, ClientMsg::KeyPress(key("g1", "a", "up")));

        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(
            drain(&mut b_rx),
            vec![ServerMsg::PlayerKeyPress(key("g1", "a", "up"))]
        );
    }

    #[test]
    fn test_key_release_keeps_sender_id() {
        let (relay, _a, mut a_rx, b, mut b_rx) = paired();

        relay.handle(&b, ClientMsg::KeyRelease(key("g1", "b", "left")));

        assert!(drain(&mut b_rx).is_empty());
        assert_eq!(
            drain(&mut a_rx),
            vec![ServerMsg::PlayerKeyRelease(key("g1", "b", "left"))]
        );
    }

    #[test]
    fn test_key_for_unknown_session_is_dropped() {
        let (relay, a, mut a_rx, _b, mut b_rx) = paired();

        relay.handle(&a, ClientMsg::KeyPress(key("other", "a", "up")));
        relay.handle(&a, ClientMsg::KeyPress(key("g1", "stranger", "up")));

        assert!(drain(&mut a_rx).is_empty());
        assert!(drain(&mut b_rx).is_empty());
    }

    #[test]
    fn test_key_with_opponent_id_is_not_echoed() {
        let (relay, a, mut a_rx, _b, mut b_rx) = paired();

        relay.handle(&a, ClientMsg::KeyPress(key("g1", "b", "up")));
        relay.handle(&a, ClientMsg::KeyRelease(key("g1", "b", "up")));

        assert!(drain(&mut a_rx).is_empty());
        assert!(drain(&mut b_rx).is_empty());
    }

    #[test]
    fn test_key_before_opponent_joins_is_dropped() {
        let relay = Relay::new();
        let (a, mut a_rx) = ConnectionHandle::new();
        relay.handle(&a, ClientMsg::CreateGame(req("g1", "a")));
        drain(&mut a_rx);

        relay.handle(&a, ClientMsg::KeyPress(key("g1", "a", "up")));

        assert!(drain(&mut a_rx).is_empty());
    }

    #[test]
    fn test_disconnect_removes_orphaned_sessions() {
        let (relay, a, _a_rx, b, _b_rx) = paired();
        assert_eq!(relay.connection_count(), 2);

        relay.on_disconnect(a.id);
        assert_eq!(relay.connection_count(), 1);
        assert_eq!(relay.session_count(), 1);

        relay.on_disconnect(b.id);
        assert_eq!(relay.connection_count(), 0);
        assert_eq!(relay.session_count(), 0);
    }

    #[test]
    fn test_disconnect_of_unknown_connection_is_noop() {
        let (relay, _a, _a_rx, _b, _b_rx) = paired();

        relay.on_disconnect(Uuid::new_v4());

        assert_eq!(relay.connection_count(), 2);
        assert_eq!(relay.session_count(), 1);
    }

    #[test]
    fn test_remove_session() {
        let (relay, _a, _a_rx, _b, _b_rx) = paired();

        assert!(relay.remove_session("g1").is_some());
        assert!(relay.remove_session("g1").is_none());
        assert_eq!(relay.session_count(), 0);
    }
}
