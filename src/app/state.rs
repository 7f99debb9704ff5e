//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::{WorldHandle, WorldInput, WorldStats};
use crate::ws::ConnectionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connections: Arc<ConnectionRegistry>,
    pub world_tx: mpsc::Sender<WorldInput>,
    pub world_stats: Arc<WorldStats>,
}

impl AppState {
    pub fn new(config: Arc<Config>, connections: Arc<ConnectionRegistry>, world: WorldHandle) -> Self {
        Self {
            config,
            connections,
            world_tx: world.input_tx,
            world_stats: world.stats,
        }
    }
}
