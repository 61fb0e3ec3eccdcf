pub mod game_service;
pub mod room_actor;
pub mod room_service;
pub mod stats_service;
