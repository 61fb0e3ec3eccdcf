use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use game_engine::{
    ActionOutcome, ConfigError, GameSettings, GameState, PhaseTransition, PlayerView, RawAction,
    WinResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    models::room::RoomStatus,
    services::{
        room_actor::{RoomClosed, RoomHandle},
        room_service::RoomServiceError,
        stats_service::{self, PlayerSummary},
    },
    state::AppState,
};

#[derive(Debug, Error)]
pub enum GameServiceError {
    #[error(transparent)]
    Room(#[from] RoomServiceError),
    #[error("no game is running in room {0}")]
    GameNotFound(String),
    #[error("the game in room {0} has already started")]
    AlreadyStarted(String),
    #[error("the game in room {0} has not finished yet")]
    NotFinished(String),
    #[error("invalid game settings: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Closed(#[from] RoomClosed),
}

impl GameServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameServiceError::Room(e) => e.status_code(),
            GameServiceError::GameNotFound(_) => StatusCode::NOT_FOUND,
            GameServiceError::AlreadyStarted(_) | GameServiceError::NotFinished(_) => {
                StatusCode::CONFLICT
            }
            GameServiceError::Config(_) => StatusCode::BAD_REQUEST,
            GameServiceError::Closed(_) => StatusCode::GONE,
        }
    }
}

impl IntoResponse for GameServiceError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WinnerStatus {
    InProgress,
    Finished { result: WinResult },
}

/// Deals roles to the room's players and hands the game to a new room actor.
/// Without explicit settings a table is derived from the player count.
pub async fn start_game(
    state: AppState,
    room_id: &str,
    settings: Option<GameSettings>,
) -> Result<String, GameServiceError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| RoomServiceError::RoomNotFound(room_id.to_string()))?;
    if room.status != RoomStatus::Open {
        return Err(GameServiceError::AlreadyStarted(room_id.to_string()));
    }

    let settings = settings.unwrap_or_else(|| GameSettings::for_player_count(room.players.len()));
    let game = GameState::initialize(room.players.clone(), settings)?;

    let tx = state.get_or_create_room_channel(room_id).await;
    let handle = RoomHandle::spawn(room_id, game, tx, &state.config);
    state.games.lock().await.insert(room_id.to_string(), handle);
    room.status = RoomStatus::InProgress;

    info!("Game started in room {} with {} players", room_id, room.players.len());
    Ok("Game started successfully".to_string())
}

async fn handle_for(state: &AppState, room_id: &str) -> Result<RoomHandle, GameServiceError> {
    state
        .game_handle(room_id)
        .await
        .ok_or_else(|| GameServiceError::GameNotFound(room_id.to_string()))
}

pub async fn get_game_state(state: AppState, room_id: &str) -> Result<GameState, GameServiceError> {
    Ok(handle_for(&state, room_id).await?.snapshot().await?)
}

pub async fn get_player_view(
    state: AppState,
    room_id: &str,
    player_id: &str,
) -> Result<PlayerView, GameServiceError> {
    Ok(handle_for(&state, room_id).await?.view_for(player_id).await?)
}

pub async fn submit_action(
    state: AppState,
    room_id: &str,
    action: RawAction,
) -> Result<ActionOutcome, GameServiceError> {
    Ok(handle_for(&state, room_id).await?.submit_action(action).await?)
}

// 手動でフェーズを進める（タイマーを使わない場合）
pub async fn advance_game_phase(
    state: AppState,
    room_id: &str,
) -> Result<PhaseTransition, GameServiceError> {
    Ok(handle_for(&state, room_id).await?.advance_phase().await?)
}

pub async fn check_winner(state: AppState, room_id: &str) -> Result<WinnerStatus, GameServiceError> {
    let game = get_game_state(state, room_id).await?;
    Ok(match game.win_result() {
        Some(result) => WinnerStatus::Finished {
            result: result.clone(),
        },
        None => WinnerStatus::InProgress,
    })
}

/// Stops the game as a draw and closes the room. The final state stays
/// readable until the room is deleted.
pub async fn end_game(
    state: AppState,
    room_id: &str,
    reason: &str,
) -> Result<bool, GameServiceError> {
    let handle = handle_for(&state, room_id).await?;
    let ended = handle.end_game(reason).await?;

    if let Some(room) = state.rooms.lock().await.get_mut(room_id) {
        room.status = RoomStatus::Closed;
    }
    info!("Game in room {} ended: {}", room_id, reason);
    Ok(ended)
}

pub async fn game_results(
    state: AppState,
    room_id: &str,
) -> Result<Vec<PlayerSummary>, GameServiceError> {
    let game = get_game_state(state, room_id).await?;
    if !game.is_finished() {
        return Err(GameServiceError::NotFinished(room_id.to_string()));
    }
    Ok(stats_service::summarize(&game))
}
