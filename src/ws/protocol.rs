//! WebSocket protocol message definitions
//! These are the wire types shared by the relay server and the game client.
//!
//! Every frame is a JSON envelope `{"message": <name>, "payload": <object>}`.

use serde::{Deserialize, Serialize};

use crate::util::emitter::Event;

/// One player slot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub id: String,
    pub ready: bool,
}

impl PlayerSlot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ready: false,
        }
    }
}

/// A pair of players sharing a game id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub game_id: String,
    pub player1: PlayerSlot,
    pub player2: Option<PlayerSlot>,
    /// Set once `game:start` has gone out
    #[serde(skip)]
    pub started: bool,
}

impl Session {
    pub fn new(game_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            player1: PlayerSlot::new(host_id),
            player2: None,
            started: false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.player2.is_some()
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.slot(player_id).is_some()
    }

    pub fn slot(&self, player_id: &str) -> Option<&PlayerSlot> {
        std::iter::once(&self.player1)
            .chain(self.player2.as_ref())
            .find(|slot| slot.id == player_id)
    }

    pub fn slot_mut(&mut self, player_id: &str) -> Option<&mut PlayerSlot> {
        if self.player1.id == player_id {
            return Some(&mut self.player1);
        }
        self.player2.as_mut().filter(|slot| slot.id == player_id)
    }

    /// The other player of the session, if `player_id` is a member and the
    /// other slot is filled
    pub fn opponent_of(&self, player_id: &str) -> Option<&PlayerSlot> {
        let player2 = self.player2.as_ref()?;
        if self.player1.id == player_id {
            Some(player2)
        } else if player2.id == player_id {
            Some(&self.player1)
        } else {
            None
        }
    }

    pub fn player_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.player1.id.as_str()).chain(self.player2.as_ref().map(|p| p.id.as_str()))
    }

    pub fn all_ready(&self) -> bool {
        self.player1.ready && self.player2.as_ref().is_some_and(|p| p.ready)
    }
}

/// Payload of the session commands (`create`, `join`, `ready`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub game_id: String,
    pub player_id: String,
}

/// A single key transition, as exchanged over the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub game_id: String,
    /// The player who pressed the key (never rewritten by the relay)
    pub player_id: String,
    /// Input name, e.g. `"up"`, `"right"`, `"left"`. The relay does not
    /// interpret it.
    pub key: String,
}

/// Messages sent from client to relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", content = "payload")]
pub enum ClientMsg {
    #[serde(rename = "cmd:game:create")]
    CreateGame(SessionRequest),

    #[serde(rename = "cmd:player:join")]
    JoinGame(SessionRequest),

    #[serde(rename = "cmd:player:ready")]
    Ready(SessionRequest),

    #[serde(rename = "cmd:key:press")]
    KeyPress(KeyEvent),

    #[serde(rename = "cmd:key:release")]
    KeyRelease(KeyEvent),
}

/// Messages sent from relay to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message", content = "payload")]
pub enum ServerMsg {
    /// Create acknowledged
    #[serde(rename = "game:created")]
    GameCreated(Session),

    /// Join rejected, second slot already taken
    #[serde(rename = "game:full")]
    GameFull(Session),

    /// Join rejected, unknown game id
    #[serde(rename = "game:not-found")]
    GameNotFound {},

    /// Second player registered
    #[serde(rename = "player:joined")]
    PlayerJoined(Session),

    /// One side marked ready
    #[serde(rename = "player:ready")]
    PlayerReady(Session),

    /// Both sides ready
    #[serde(rename = "game:start")]
    GameStart(Session),

    /// Opponent pressed a key
    #[serde(rename = "player:key:press")]
    PlayerKeyPress(KeyEvent),

    /// Opponent released a key
    #[serde(rename = "player:key:release")]
    PlayerKeyRelease(KeyEvent),
}

impl ServerMsg {
    pub const GAME_CREATED: &'static str = "game:created";
    pub const GAME_FULL: &'static str = "game:full";
    pub const GAME_NOT_FOUND: &'static str = "game:not-found";
    pub const PLAYER_JOINED: &'static str = "player:joined";
    pub const PLAYER_READY: &'static str = "player:ready";
    pub const GAME_START: &'static str = "game:start";
    pub const PLAYER_KEY_PRESS: &'static str = "player:key:press";
    pub const PLAYER_KEY_RELEASE: &'static str = "player:key:release";
}

impl Event for ServerMsg {
    fn name(&self) -> &'static str {
        match self {
            ServerMsg::GameCreated(_) => Self::GAME_CREATED,
            ServerMsg::GameFull(_) => Self::GAME_FULL,
            ServerMsg::GameNotFound {} => Self::GAME_NOT_FOUND,
            ServerMsg::PlayerJoined(_) => Self::PLAYER_JOINED,
            ServerMsg::PlayerReady(_) => Self::PLAYER_READY,
            ServerMsg::GameStart(_) => Self::GAME_START,
            ServerMsg::PlayerKeyPress(_) => Self::PLAYER_KEY_PRESS,
            ServerMsg::PlayerKeyRelease(_) => Self::PLAYER_KEY_RELEASE,
        }
    }
}

/// Frame decoding errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ClientMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Key press or release, as opposed to a session command
    pub fn is_key_event(&self) -> bool {
        matches!(self, ClientMsg::KeyPress(_) | ClientMsg::KeyRelease(_))
    }
}

impl ServerMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
