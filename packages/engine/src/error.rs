use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ActionKind, Phase, PlayerId, Role};

/// Invalid input to game initialization. No game exists when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least {min} players are required, got {actual}")]
    TooFewPlayers { min: usize, actual: usize },
    #[error("this table seats at most {max} players, got {actual}")]
    TooManyPlayers { max: usize, actual: usize },
    #[error("player {0} joined more than once")]
    DuplicatePlayer(PlayerId),
    #[error("role counts add up to {roles} but {players} players joined")]
    RoleCountMismatch { roles: usize, players: usize },
    #[error("at least one mafia role is required")]
    NoAntagonists,
    #[error("every seat is mafia, leaving no opposing team")]
    OnlyAntagonists,
}

/// A wire payload that could not be turned into a [`crate::PlayerAction`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RawActionError {
    #[error("unknown action type `{kind}`")]
    UnknownActionType { kind: String },
    #[error("missing required field `{field}`")]
    MissingField { field: String },
    #[error("timestamp `{value}` is not a valid RFC 3339 date")]
    InvalidTimestamp { value: String },
}

impl RawActionError {
    pub fn missing(field: &str) -> Self {
        RawActionError::MissingField {
            field: field.to_string(),
        }
    }
}

/// Why an action was refused. Rejections are values, never panics, and the
/// messages are meant to be shown to the player as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Rejection {
    #[error("{source}")]
    Malformed {
        #[from]
        source: RawActionError,
    },
    #[error("player {player_id} is not part of this game")]
    UnknownPlayer { player_id: PlayerId },
    #[error("action timestamp lies in the future")]
    FutureTimestamp,
    #[error("player {player_id} is dead and cannot act")]
    ActorDead { player_id: PlayerId },
    #[error("player {player_id} is dead and cannot be targeted")]
    TargetDead { player_id: PlayerId },
    #[error("cannot {action} during the {phase} phase")]
    WrongPhase { action: ActionKind, phase: Phase },
    #[error("a {role} cannot {action}")]
    RoleNotPermitted { role: Role, action: ActionKind },
    #[error("you cannot {action} yourself")]
    SelfTargetNotAllowed { action: ActionKind },
    #[error("mafia cannot target a fellow mafia member")]
    FriendlyTarget,
    #[error("the game has already finished")]
    GameFinished,
}
