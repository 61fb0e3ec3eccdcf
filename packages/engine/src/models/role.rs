use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Villager,  // 能力なし
    Mafia,     // 夜に襲撃
    Doctor,    // 夜に治療
    Detective, // 夜に調査
    Bodyguard, // 夜に護衛
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Villagers,
    Mafia,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Villager,
        Role::Mafia,
        Role::Doctor,
        Role::Detective,
        Role::Bodyguard,
    ];

    pub fn team(self) -> Team {
        match self {
            Role::Mafia => Team::Mafia,
            Role::Villager | Role::Doctor | Role::Detective | Role::Bodyguard => Team::Villagers,
        }
    }

    pub fn is_antagonist(self) -> bool {
        self.team() == Team::Mafia
    }

    /// The night ability granted by this role, if any.
    pub fn night_ability(self) -> Option<ActionKind> {
        match self {
            Role::Villager => None,
            Role::Mafia => Some(ActionKind::Kill),
            Role::Doctor => Some(ActionKind::Heal),
            Role::Detective => Some(ActionKind::Investigate),
            Role::Bodyguard => Some(ActionKind::Protect),
        }
    }

    /// Every living player may vote; night actions are tied to a single role.
    pub fn can_perform(self, kind: ActionKind) -> bool {
        kind == ActionKind::Vote || self.night_ability() == Some(kind)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Villager => write!(f, "villager"),
            Role::Mafia => write!(f, "mafia"),
            Role::Doctor => write!(f, "doctor"),
            Role::Detective => write!(f, "detective"),
            Role::Bodyguard => write!(f, "bodyguard"),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Villagers => write!(f, "villagers"),
            Team::Mafia => write!(f, "mafia"),
        }
    }
}
