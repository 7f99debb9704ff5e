//! Realm Authority Server - authoritative multiplayer world server
//!
//! This is the main entry point. It handles:
//! - Loading game data and spawning the placed references
//! - The world task that applies every client action in order
//! - WebSocket connections for real-time gameplay and a health endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realm_authority_server::app::AppState;
use realm_authority_server::config::Config;
use realm_authority_server::game::{CoreSettings, GameServer, WorldLoop};
use realm_authority_server::gamedata::StaticGameData;
use realm_authority_server::http::build_router;
use realm_authority_server::util::time::init_server_time;
use realm_authority_server::ws::ConnectionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Realm Authority Server");
    info!("Server address: {}", config.server_addr);

    let (game_data, loaded) = match &config.game_data_path {
        Some(path) => (StaticGameData::from_file(path)?, true),
        None => {
            warn!("GAME_DATA_PATH not set, running with an empty data set");
            (StaticGameData::default(), false)
        }
    };
    let game_data = Arc::new(game_data);

    let connections = Arc::new(ConnectionRegistry::new(config.max_players));

    let mut server = GameServer::new(game_data.clone(), connections.clone())
        .with_settings(CoreSettings::from(&*config))
        .with_game_data_loaded(loaded);
    server.load_references(&game_data);

    // Spawn the world task
    let (world, world_handle) = WorldLoop::new(server, config.tick_rate);
    tokio::spawn(world.run());

    // Build router
    let state = AppState::new(config.clone(), connections, world_handle);
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
