//! WebSocket transport: connection registry, upgrade handler and wire types

pub mod connections;
pub mod handler;
pub mod protocol;

pub use connections::ConnectionRegistry;
pub use handler::ws_handler;
