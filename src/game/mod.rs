//! Authoritative action core: world state, authority and per-message handlers

pub mod actions;
pub mod authority;
pub mod broadcast;
pub mod combat;
pub mod damage;
pub mod error;
pub mod events;
pub mod form;
pub mod inventory;
pub mod math;
pub mod movement;
pub mod regen;
pub mod server;
pub mod sessions;
pub mod timers;
pub mod world;
pub mod world_loop;

#[cfg(test)]
pub mod testing;

pub use authority::{Authority, DenyReason, HostOutcome};
pub use broadcast::SendTarget;
pub use damage::{DamageModel, DefaultDamageModel};
pub use error::ActionError;
pub use events::{EventBus, GameEvent, ScriptValue, WorldServices};
pub use form::{ActorState, ActorValues, Form};
pub use server::{CoreSettings, GameServer};
pub use sessions::UserId;
pub use world::World;
pub use world_loop::{WorldHandle, WorldLoop, WorldStats};

use std::time::Instant;

use bytes::Bytes;

use crate::ws::protocol::ClientMsg;

/// One decoded client message, queued for the world task
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub msg: ClientMsg,
    /// Exact bytes received, relayed unmodified to neighbours
    pub raw: Bytes,
    pub received_at: Instant,
}

/// Everything the world task consumes, in arrival order
#[derive(Debug)]
pub enum WorldInput {
    Connected { user_id: UserId },
    Message(InboundMessage),
    Disconnected { user_id: UserId },
}
