//! Duel relay - session relay server and deterministic fighter simulation
//!
//! The server half pairs two players per game and forwards their key
//! events; the client half turns local and relayed keys into fighter state
//! through the same controller wiring.

pub mod app;
pub mod client;
pub mod config;
pub mod game;
pub mod http;
pub mod input;
pub mod relay;
pub mod util;
pub mod ws;
