//! Lobby handshake: create or join a session, then signal readiness.

use tracing::info;

use crate::util::emitter::Event;
use crate::ws::protocol::{ClientMsg, ServerMsg, Session, SessionRequest};

use super::transport::{ClientError, TransportClient};

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("Game {0} is full")]
    Full(String),

    #[error("Game {0} not found")]
    NotFound(String),

    #[error("Connection closed while waiting for the relay")]
    Closed,

    #[error("Unexpected relay reply: {0}")]
    Unexpected(&'static str),

    #[error(transparent)]
    Transport(#[from] ClientError),
}

/// Outcome of a successful create/join: who plays whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub game_id: String,
    pub player_id: String,
    pub opponent_id: String,
    /// The host controls the left fighter
    pub is_host: bool,
}

fn request(game_id: &str, player_id: &str) -> SessionRequest {
    SessionRequest {
        game_id: game_id.to_string(),
        player_id: player_id.to_string(),
    }
}

fn matchup_from(session: &Session, player_id: &str, is_host: bool) -> Result<Matchup, LobbyError> {
    let opponent = session
        .opponent_of(player_id)
        .ok_or(LobbyError::Unexpected(ServerMsg::PLAYER_JOINED))?;
    Ok(Matchup {
        game_id: session.game_id.clone(),
        player_id: player_id.to_string(),
        opponent_id: opponent.id.clone(),
        is_host,
    })
}

/// Create `game_id` and wait until a second player joins it
pub async fn host(client: &TransportClient, game_id: &str, player_id: &str) -> Result<Matchup, LobbyError> {
    let joined = client.wait_for(&[ServerMsg::PLAYER_JOINED]);
    client.send(&ClientMsg::CreateGame(request(game_id, player_id)))?;
    info!(game_id = %game_id, "Waiting for an opponent");

    match joined.await.map_err(|_| LobbyError::Closed)? {
        ServerMsg::PlayerJoined(session) => matchup_from(&session, player_id, true),
        other => Err(LobbyError::Unexpected(other.name())),
    }
}

/// Join an existing game created by another player
pub async fn join(client: &TransportClient, game_id: &str, player_id: &str) -> Result<Matchup, LobbyError> {
    let reply = client.wait_for(&[
        ServerMsg::PLAYER_JOINED,
        ServerMsg::GAME_FULL,
        ServerMsg::GAME_NOT_FOUND,
    ]);
    client.send(&ClientMsg::JoinGame(request(game_id, player_id)))?;

    match reply.await.map_err(|_| LobbyError::Closed)? {
        ServerMsg::PlayerJoined(session) => matchup_from(&session, player_id, false),
        ServerMsg::GameFull(_) => Err(LobbyError::Full(game_id.to_string())),
        ServerMsg::GameNotFound {} => Err(LobbyError::NotFound(game_id.to_string())),
        other => Err(LobbyError::Unexpected(other.name())),
    }
}

/// Mark this player ready and wait for both sides to be ready
pub async fn ready(client: &TransportClient, matchup: &Matchup) -> Result<Session, LobbyError> {
    let start = client.wait_for(&[ServerMsg::GAME_START]);
    client.send(&ClientMsg::Ready(request(&matchup.game_id, &matchup.player_id)))?;

    match start.await.map_err(|_| LobbyError::Closed)? {
        ServerMsg::GameStart(session) => Ok(session),
        other => Err(LobbyError::Unexpected(other.name())),
    }
}
