//! Configuration module - environment variable parsing

use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::math::Vec3;

/// Upper bound for `TICK_RATE`; the tick period must stay above zero
pub const MAX_TICK_RATE: u32 = 1000;
/// Upper bound for `RESPAWN_DELAY_SECS` (one day)
pub const MAX_RESPAWN_DELAY_SECS: u64 = 24 * 60 * 60;
/// Upper bound for each `RELOOT_TIMES` entry (30 days)
pub const MAX_RELOOT_SECS: u64 = 30 * 24 * 60 * 60;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// JSON game data export; an empty data set is used when absent
    pub game_data_path: Option<PathBuf>,
    /// Connections beyond this are refused at upgrade
    pub max_players: usize,
    /// World loop ticks per second
    pub tick_rate: u32,

    /// Actors closer than this (same cell or world) listen to each other
    pub neighbour_radius: f32,
    pub respawn_delay: Duration,
    /// Units per second
    pub max_movement_speed: f32,

    /// Where newly connected players appear
    pub spawn_cell: u32,
    pub spawn_pos: Vec3,
    pub player_race: u32,
    /// Container reloot delay by record type, from `RELOOT_TIMES` ("CONT=3600,FLOR=600")
    pub reloot_times: HashMap<String, Duration>,

    /// Allowed client origins for CORS, comma separated. Any origin when unset.
    pub client_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 7777)),
            log_level: "info".to_string(),
            game_data_path: None,
            max_players: 100,
            tick_rate: 30,
            neighbour_radius: 8192.0,
            respawn_delay: Duration::from_secs(5),
            max_movement_speed: 4096.0,
            spawn_cell: 0x3c,
            spawn_pos: Vec3::ZERO,
            player_race: 0x13746,
            reloot_times: HashMap::from([("CONT".to_string(), Duration::from_secs(60 * 60))]),
            client_origin: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let server_addr = match (var("PORT"), var("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port),
            (None, Some(addr)) => addr,
            (None, None) => defaults.server_addr.to_string(),
        };

        let respawn_delay_secs =
            parse_or(&var, "RESPAWN_DELAY_SECS", defaults.respawn_delay.as_secs())?;
        if respawn_delay_secs > MAX_RESPAWN_DELAY_SECS {
            return Err(ConfigError::Invalid("RESPAWN_DELAY_SECS"));
        }
        let respawn_delay = Duration::from_secs(respawn_delay_secs);

        let spawn_pos = match var("SPAWN_POS") {
            Some(raw) => parse_vec3(&raw).ok_or(ConfigError::Invalid("SPAWN_POS"))?,
            None => defaults.spawn_pos,
        };

        let tick_rate: u32 = parse_or(&var, "TICK_RATE", defaults.tick_rate)?;
        if tick_rate == 0 || tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),

            game_data_path: var("GAME_DATA_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            max_players: parse_or(&var, "MAX_PLAYERS", defaults.max_players)?,
            tick_rate,

            neighbour_radius: parse_or(&var, "NEIGHBOUR_RADIUS", defaults.neighbour_radius)?,
            respawn_delay,
            max_movement_speed: parse_or(&var, "MAX_MOVEMENT_SPEED", defaults.max_movement_speed)?,

            spawn_cell: match var("SPAWN_CELL") {
                Some(raw) => parse_form_id(&raw).ok_or(ConfigError::Invalid("SPAWN_CELL"))?,
                None => defaults.spawn_cell,
            },
            spawn_pos,
            player_race: match var("PLAYER_RACE") {
                Some(raw) => parse_form_id(&raw).ok_or(ConfigError::Invalid("PLAYER_RACE"))?,
                None => defaults.player_race,
            },
            reloot_times: match var("RELOOT_TIMES") {
                Some(raw) => parse_reloot_times(&raw).ok_or(ConfigError::Invalid("RELOOT_TIMES"))?,
                None => defaults.reloot_times,
            },

            client_origin: var("CLIENT_ORIGIN").filter(|o| !o.trim().is_empty()),
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Form ids are accepted in decimal or `0x` hex
fn parse_form_id(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// "TYPE=secs" pairs, comma separated. An empty value disables reloot.
fn parse_reloot_times(raw: &str) -> Option<HashMap<String, Duration>> {
    let mut times = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (record_type, secs) = pair.split_once('=')?;
        let record_type = record_type.trim();
        let secs: u64 = secs.trim().parse().ok()?;
        if record_type.is_empty() || secs > MAX_RELOOT_SECS {
            return None;
        }
        times.insert(record_type.to_uppercase(), Duration::from_secs(secs));
    }
    Some(times)
}

/// "x,y,z"
fn parse_vec3(raw: &str) -> Option<Vec3> {
    let mut parts = raw.split(',').map(|p| p.trim().parse::<f32>());
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Vec3::new(x, y, z))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
