//! Live WebSocket connections, keyed by the user id the world knows them by

use axum::extract::ws::Message;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use crate::game::{SendTarget, UserId};

/// Outbound queue of one connection
pub type OutboundTx = mpsc::Sender<Message>;

pub struct ConnectionRegistry {
    connections: DashMap<UserId, OutboundTx>,
    next_user_id: Mutex<UserId>,
    max_players: usize,
}

impl ConnectionRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_user_id: Mutex::new(0),
            max_players,
        }
    }

    /// Allocate a user id for a new connection. `None` when the server is full.
    pub fn register(&self, tx: OutboundTx) -> Option<UserId> {
        let mut next = self.next_user_id.lock();
        if self.connections.len() >= self.max_players {
            return None;
        }

        for _ in 0..=UserId::MAX as usize {
            let candidate = *next;
            *next = next.wrapping_add(1);
            if let Entry::Vacant(slot) = self.connections.entry(candidate) {
                slot.insert(tx);
                return Some(candidate);
            }
        }
        None
    }

    pub fn unregister(&self, user_id: UserId) {
        self.connections.remove(&user_id);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.max_players
    }
}

impl SendTarget for ConnectionRegistry {
    fn send(&self, user_id: UserId, data: &[u8], reliable: bool) {
        let Some(tx) = self.connections.get(&user_id).map(|c| c.value().clone()) else {
            trace!(user_id, "Dropping packet for disconnected user");
            return;
        };

        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec()),
        };

        match tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) if reliable => {
                warn!(user_id, "Outbound queue full, reliable packet dropped");
            }
            Err(TrySendError::Full(_)) => {
                trace!(user_id, "Outbound queue full, unreliable packet dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(user_id, "Outbound channel closed");
            }
        }
    }
}
