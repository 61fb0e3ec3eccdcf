use std::{env, net::SocketAddr};

use game_engine::DEFAULT_MAX_PLAYERS;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub verbose_logging: bool,
    // プレイヤーの役職をログに出すかどうか
    pub show_player_roles: bool,
    // タイマーで自動的にフェーズを進めるかどうか
    pub auto_advance_phases: bool,
    // 全員の行動が揃ったら時間を待たずに進めるかどうか
    pub advance_when_ready: bool,
    pub default_max_players: usize,
    pub room_queue_capacity: usize,
    pub broadcast_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let debug_mode = cfg!(debug_assertions) || env::var("DEBUG_MODE").is_ok();

        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_origin: "http://localhost:3000".to_string(),
            verbose_logging: debug_mode,
            show_player_roles: debug_mode,
            auto_advance_phases: false,
            advance_when_ready: false,
            default_max_players: DEFAULT_MAX_PLAYERS,
            room_queue_capacity: 64,
            broadcast_capacity: 1000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or(defaults.bind_addr);
        let cors_origin = env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);
        let verbose_logging = env_flag("VERBOSE_LOGGING").unwrap_or(defaults.verbose_logging);
        let show_player_roles = env_flag("SHOW_PLAYER_ROLES").unwrap_or(defaults.show_player_roles);
        let auto_advance_phases = env_flag("AUTO_ADVANCE_PHASES").unwrap_or(false);
        let advance_when_ready = env_flag("ADVANCE_WHEN_READY").unwrap_or(false);
        let default_max_players =
            env_number("DEFAULT_MAX_PLAYERS").unwrap_or(defaults.default_max_players);
        let room_queue_capacity =
            env_number("ROOM_QUEUE_CAPACITY").unwrap_or(defaults.room_queue_capacity);
        let broadcast_capacity =
            env_number("BROADCAST_CAPACITY").unwrap_or(defaults.broadcast_capacity);

        Self {
            bind_addr,
            cors_origin,
            verbose_logging,
            show_player_roles,
            auto_advance_phases,
            advance_when_ready,
            default_max_players,
            room_queue_capacity: room_queue_capacity.max(1),
            broadcast_capacity: broadcast_capacity.max(1),
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| v == "true" || v == "1")
}

fn env_number(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse::<usize>().ok())
}
