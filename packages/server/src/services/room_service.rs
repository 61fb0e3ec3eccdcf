use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use game_engine::Player;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    models::room::{Room, RoomStatus},
    state::AppState,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomServiceError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("room {0} is not accepting players")]
    RoomNotOpen(String),
    #[error("room {0} is full")]
    RoomFull(String),
    #[error("player {player_id} already joined room {room_id}")]
    AlreadyJoined { room_id: String, player_id: String },
    #[error("player {player_id} is not in room {room_id}")]
    NotInRoom { room_id: String, player_id: String },
}

impl RoomServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RoomServiceError::RoomNotFound(_) | RoomServiceError::NotInRoom { .. } => {
                StatusCode::NOT_FOUND
            }
            RoomServiceError::RoomNotOpen(_)
            | RoomServiceError::RoomFull(_)
            | RoomServiceError::AlreadyJoined { .. } => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for RoomServiceError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

pub async fn create_room(state: AppState) -> String {
    let mut rooms = state.rooms.lock().await;
    // 数値でないIDは無視して連番を振る
    let new_id = rooms
        .keys()
        .filter_map(|k| k.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let new_room = Room::new(
        new_id.to_string(),
        None,
        Some(state.config.default_max_players),
    );
    rooms.insert(new_id.to_string(), new_room);
    info!("Room {} created", new_id);
    new_id.to_string()
}

pub async fn join_room(
    state: AppState,
    room_id: &str,
    player_id: &str,
    name: Option<String>,
) -> Result<(), RoomServiceError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| RoomServiceError::RoomNotFound(room_id.to_string()))?;

    // ルームの状態がOpenか確認
    if room.status != RoomStatus::Open {
        return Err(RoomServiceError::RoomNotOpen(room_id.to_string()));
    }

    // 既に参加しているプレイヤーかチェック
    if room.has_player(player_id) {
        return Err(RoomServiceError::AlreadyJoined {
            room_id: room_id.to_string(),
            player_id: player_id.to_string(),
        });
    }

    // プレイヤー数の上限チェック
    if room.is_full() {
        return Err(RoomServiceError::RoomFull(room_id.to_string()));
    }

    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Player {}", player_id));
    room.players.push(Player::new(player_id, name));
    info!("Player {} joined room {}", player_id, room_id);
    Ok(())
}

/// Leaving is only possible before the game starts; the dealt table is fixed.
pub async fn leave_room(
    state: AppState,
    room_id: &str,
    player_id: &str,
) -> Result<(), RoomServiceError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| RoomServiceError::RoomNotFound(room_id.to_string()))?;

    if room.status != RoomStatus::Open {
        return Err(RoomServiceError::RoomNotOpen(room_id.to_string()));
    }

    let index = room
        .players
        .iter()
        .position(|p| p.id == player_id)
        .ok_or_else(|| RoomServiceError::NotInRoom {
            room_id: room_id.to_string(),
            player_id: player_id.to_string(),
        })?;
    room.players.remove(index);
    info!("Player {} left room {}", player_id, room_id);
    Ok(())
}

pub async fn get_rooms(state: &AppState) -> HashMap<String, Room> {
    state.rooms.lock().await.clone()
}

pub async fn get_room_info(state: &AppState, room_id: &str) -> Result<Room, RoomServiceError> {
    let rooms = state.rooms.lock().await;
    rooms
        .get(room_id)
        .cloned()
        .ok_or_else(|| RoomServiceError::RoomNotFound(room_id.to_string()))
}

/// Removes the room and stops its game, if one is running.
pub async fn delete_room(state: AppState, room_id: &str) -> Result<(), RoomServiceError> {
    let mut rooms = state.rooms.lock().await;
    if rooms.remove(room_id).is_none() {
        return Err(RoomServiceError::RoomNotFound(room_id.to_string()));
    }

    let handle = state.games.lock().await.remove(room_id);
    if let Some(handle) = handle {
        if let Err(e) = handle.shutdown().await {
            warn!("Game actor for room {} was already gone: {}", room_id, e);
        }
    }
    state.remove_room_channel(room_id).await;
    info!("Room {} deleted", room_id);
    Ok(())
}
