use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures::{sink::SinkExt, stream::StreamExt};
use game_engine::RawAction;
use serde::Deserialize;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::message::{ClientMessage, ServerEvent, ServerPayload};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    player_id: Option<String>,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, query.player_id))
}

/// Fills in what a connected client may leave out: its own id and the time.
/// Sessions opened without `player_id` are spectators and cannot act.
fn complete_action(mut action: RawAction, player_id: Option<&str>) -> Result<RawAction, String> {
    let player_id = player_id
        .ok_or_else(|| "connect with ?player_id= to submit actions".to_string())?;
    // なりすまし防止のため接続時のIDで上書きする
    action.actor_id = Some(player_id.to_string());
    if action.timestamp.is_none() {
        action.timestamp = Some(Utc::now().to_rfc3339());
    }
    Ok(action)
}

pub async fn handle_socket(
    ws: WebSocket,
    state: AppState,
    room_id: String,
    player_id: Option<String>,
) {
    let connection_id = Uuid::new_v4();
    info!(
        "New WebSocket connection {} for room {} (player {:?})",
        connection_id, room_id, player_id
    );
    let tx = state.get_or_create_room_channel(&room_id).await;

    let (mut sender, mut receiver) = ws.split();
    let mut rx = tx.subscribe();
    // このセッション宛ての返信
    let (direct_tx, mut direct_rx) = mpsc::channel::<ServerEvent>(32);

    if let (Some(player_id), Some(game)) = (&player_id, state.game_handle(&room_id).await) {
        if let Err(e) = game.player_connected(player_id).await {
            warn!("Could not announce player {}: {}", player_id, e);
        }
    }

    let player_for_receive = player_id.clone();
    let room_for_receive = room_id.clone();
    let state_for_receive = state.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => continue,
                Ok(ClientMessage::Action { action }) => {
                    match complete_action(action, player_for_receive.as_deref()) {
                        Ok(action) => match state_for_receive.game_handle(&room_for_receive).await {
                            Some(game) => match game.submit_action(action).await {
                                Ok(outcome) => ServerPayload::ActionResult { outcome },
                                Err(e) => ServerPayload::Error {
                                    message: e.to_string(),
                                },
                            },
                            None => ServerPayload::Error {
                                message: format!("no game is running in room {}", room_for_receive),
                            },
                        },
                        Err(message) => ServerPayload::Error { message },
                    }
                }
                // 不正なメッセージフォーマットの場合、エラーメッセージを送信
                Err(e) => ServerPayload::Error {
                    message: format!("malformed message: {}", e),
                },
            };

            let event = match &player_for_receive {
                Some(player_id) => ServerEvent::to_player(&room_for_receive, player_id, reply),
                None => ServerEvent::broadcast(&room_for_receive, reply),
            };
            if direct_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let player_for_send = player_id.clone();
    let room_for_send = room_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(event) => event,
                    None => break,
                },
                broadcast = rx.recv() => match broadcast {
                    Ok(event) if event.is_visible_to(player_for_send.as_deref()) => event,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Connection in room {} skipped {} events", room_for_send, skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // どちらかが終われば接続を閉じる
    tokio::select! {
        _ = &mut receive_task => send_task.abort(),
        _ = &mut send_task => receive_task.abort(),
    }

    if let (Some(player_id), Some(game)) = (&player_id, state.game_handle(&room_id).await) {
        let _ = game.player_disconnected(player_id).await;
    }
    info!("WebSocket connection {} closed", connection_id);
}
