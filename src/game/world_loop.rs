//! The world task: sole owner of the [`GameServer`], applying inputs in
//! arrival order and firing due timers every tick

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use super::{GameServer, WorldInput};
use crate::config::MAX_TICK_RATE;

/// Inputs buffered between connections and the world task
const INPUT_QUEUE_CAPACITY: usize = 1024;

/// Counters published by the world task for the health endpoint
#[derive(Debug, Default)]
pub struct WorldStats {
    users: AtomicUsize,
    forms: AtomicUsize,
}

impl WorldStats {
    pub fn users(&self) -> usize {
        self.users.load(Ordering::Relaxed)
    }

    pub fn forms(&self) -> usize {
        self.forms.load(Ordering::Relaxed)
    }

    fn record(&self, server: &GameServer) {
        self.users.store(server.sessions.len(), Ordering::Relaxed);
        self.forms.store(server.world.len(), Ordering::Relaxed);
    }
}

/// Handle to the running world task
#[derive(Clone)]
pub struct WorldHandle {
    pub input_tx: mpsc::Sender<WorldInput>,
    pub stats: Arc<WorldStats>,
}

pub struct WorldLoop {
    server: GameServer,
    input_rx: mpsc::Receiver<WorldInput>,
    stats: Arc<WorldStats>,
    tick_rate: u32,
}

impl WorldLoop {
    pub fn new(server: GameServer, tick_rate: u32) -> (Self, WorldHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let stats = Arc::new(WorldStats::default());
        stats.record(&server);

        let handle = WorldHandle {
            input_tx,
            stats: stats.clone(),
        };
        let world = Self {
            server,
            input_rx,
            stats,
            tick_rate: tick_rate.clamp(1, MAX_TICK_RATE),
        };
        (world, handle)
    }

    /// Run until every input sender is dropped
    pub async fn run(mut self) {
        info!(
            tick_rate = self.tick_rate,
            forms = self.server.world.len(),
            "World loop started"
        );

        let tick_duration = Duration::from_micros(1_000_000 / self.tick_rate as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            let open = self.process_inputs();
            self.server.tick_timers(Instant::now());
            self.stats.record(&self.server);

            if !open {
                info!("World input closed, stopping world loop");
                break;
            }
        }
    }

    /// Drain queued inputs. Returns false once the queue is closed.
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => self.apply(input),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn apply(&mut self, input: WorldInput) {
        match input {
            WorldInput::Connected { user_id } => {
                self.server.connect_user(user_id);
            }
            WorldInput::Message(message) => {
                let user_id = message.user_id;
                let kind = message.msg.kind();
                if let Err(e) = self.server.handle(message) {
                    error!(user_id, kind, error = %e, "Failed to process message");
                }
            }
            WorldInput::Disconnected { user_id } => {
                debug!(user_id, "Processing disconnect");
                self.server.disconnect_user(user_id);
            }
        }
    }
}
