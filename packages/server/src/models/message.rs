use chrono::{DateTime, Utc};
use game_engine::{ActionOutcome, GameEvent, Phase, RawAction, WinResult};
use serde::{Deserialize, Serialize};

/// Everything the server pushes to websocket clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEvent {
    pub room_id: String,
    // 特定のプレイヤーのみに送信する場合
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: ServerPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerPayload {
    GameEvent {
        event: GameEvent,
    },
    PhaseChange {
        from_phase: Phase,
        to_phase: Phase,
        day_number: u32,
        ends_at: Option<DateTime<Utc>>,
    },
    GameEnded {
        result: WinResult,
    },
    ActionResult {
        outcome: ActionOutcome,
    },
    PlayerConnected {
        player_id: String,
    },
    PlayerDisconnected {
        player_id: String,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn broadcast(room_id: &str, payload: ServerPayload) -> Self {
        Self {
            room_id: room_id.to_string(),
            target_player_id: None,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn to_player(room_id: &str, player_id: &str, payload: ServerPayload) -> Self {
        Self {
            target_player_id: Some(player_id.to_string()),
            ..Self::broadcast(room_id, payload)
        }
    }

    /// Whether a session bound to `player_id` should receive this event.
    pub fn is_visible_to(&self, player_id: Option<&str>) -> bool {
        match (&self.target_player_id, player_id) {
            (None, _) => true,
            (Some(target), Some(player_id)) => target == player_id,
            (Some(_), None) => false,
        }
    }
}

/// Messages a websocket client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    Action { action: RawAction },
    Ping,
}
