use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use game_engine::{GameSettings, RawAction};
use serde::{Deserialize, Serialize};

use crate::{
    services::game_service::{self, GameServiceError},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    player_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndGameRequest {
    reason: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:roomid",
            Router::new()
                // ゲームの基本操作
                .route("/start", post(start_game))
                .route("/end", post(end_game_handler))
                .route("/state", get(get_game_state))
                // ゲームアクション（投票・夜の行動）
                .route("/actions", post(action_handler))
                // ゲーム進行の管理
                .route("/phase/next", post(advance_phase_handler))
                .route("/check-winner", get(check_winner_handler))
                .route("/results", get(results_handler)),
        )
        .with_state(state)
}

pub async fn start_game(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    settings: Option<Json<GameSettings>>,
) -> Result<impl IntoResponse, GameServiceError> {
    let message =
        game_service::start_game(state, &room_id, settings.map(|Json(s)| s)).await?;
    Ok((StatusCode::OK, Json(message)))
}

pub async fn get_game_state(
    Path(room_id): Path<String>,
    Query(query): Query<StateQuery>,
    State(state): State<AppState>,
) -> Result<Response, GameServiceError> {
    // player_id があればそのプレイヤーから見える情報だけを返す
    let response = match query.player_id {
        Some(player_id) => {
            let view = game_service::get_player_view(state, &room_id, &player_id).await?;
            (StatusCode::OK, Json(view)).into_response()
        }
        None => {
            let game = game_service::get_game_state(state, &room_id).await?;
            (StatusCode::OK, Json(game)).into_response()
        }
    };
    Ok(response)
}

async fn end_game_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    request: Option<Json<EndGameRequest>>,
) -> Result<impl IntoResponse, GameServiceError> {
    let reason = request
        .map(|Json(r)| r.reason)
        .unwrap_or_else(|| "the game was ended by the host".to_string());
    let ended = game_service::end_game(state, &room_id, &reason).await?;
    let message = if ended {
        "Game ended successfully"
    } else {
        "Game had already finished"
    };
    Ok((StatusCode::OK, Json(message)))
}

async fn action_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(action): Json<RawAction>,
) -> Result<impl IntoResponse, GameServiceError> {
    let outcome = game_service::submit_action(state, &room_id, action).await?;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}

async fn advance_phase_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, GameServiceError> {
    let transition = game_service::advance_game_phase(state, &room_id).await?;
    Ok((StatusCode::OK, Json(transition)))
}

async fn check_winner_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, GameServiceError> {
    let status = game_service::check_winner(state, &room_id).await?;
    Ok((StatusCode::OK, Json(status)))
}

async fn results_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, GameServiceError> {
    let results = game_service::game_results(state, &room_id).await?;
    Ok((StatusCode::OK, Json(results)))
}
