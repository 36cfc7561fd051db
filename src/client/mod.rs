//! Client side of the relay: transport, lobby handshake and fight wiring

pub mod fight;
pub mod lobby;
pub mod transport;

pub use fight::Fight;
pub use lobby::{host, join, ready, LobbyError, Matchup};
pub use transport::{ClientError, TransportClient};
