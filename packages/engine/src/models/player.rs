use serde::{Deserialize, Serialize};

use super::{
    game::{Phase, Vote, WinResult},
    role::Role,
};

pub type PlayerId = String;

/// A seat at the table as supplied by the room, before roles are dealt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub is_alive: bool,
    // 夜ごとにリセットされる
    pub protected_this_night: bool,
    pub healed_this_night: bool,
}

impl PlayerState {
    pub(crate) fn new(player: Player, role: Role) -> Self {
        Self {
            id: player.id,
            name: player.name,
            role,
            is_alive: true,
            protected_this_night: false,
            healed_this_night: false,
        }
    }

    pub fn is_shielded(&self) -> bool {
        self.protected_this_night || self.healed_this_night
    }
}

/// What one seat at the table is allowed to know.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub viewer_id: PlayerId,
    pub your_role: Option<Role>,
    pub phase: Phase,
    pub day_number: u32,
    pub players: Vec<PublicPlayer>,
    pub votes: Vec<Vote>,
    pub win_result: Option<WinResult>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub name: String,
    pub is_alive: bool,
    /// Only revealed for the viewer, dead players, fellow mafia, or once the game is over.
    pub role: Option<Role>,
}
