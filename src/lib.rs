//! Authoritative action core of a multiplayer open-world game server.
//!
//! Clients connect over WebSocket, every decoded message is queued to a single
//! world task, and [`game::GameServer::handle`] applies it against the world
//! after authority, movement and combat checks.

pub mod app;
pub mod config;
pub mod game;
pub mod gamedata;
pub mod http;
pub mod util;
pub mod ws;
