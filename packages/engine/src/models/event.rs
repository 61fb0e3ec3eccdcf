use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    action::{ActionAttempt, Applied, PlayerAction},
    game::{EliminationCause, Phase, VoteTally, WinResult},
    player::PlayerId,
    role::{Role, Team},
    settings::RoleCount,
};
use crate::error::Rejection;

/// One entry of the append-only audit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub sequence: u64,
    pub day_number: u32,
    pub phase: Phase,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    GameStarted {
        player_count: usize,
        roles: Vec<RoleCount>,
    },
    ActionApplied {
        action: PlayerAction,
        applied: Applied,
    },
    ActionRejected {
        attempt: ActionAttempt,
        reason: Rejection,
    },
    VotesTallied {
        tally: VoteTally,
    },
    PlayerEliminated {
        player_id: PlayerId,
        role: Role,
        cause: EliminationCause,
    },
    KillPrevented {
        target_id: PlayerId,
    },
    InvestigationResolved {
        actor_id: PlayerId,
        target_id: PlayerId,
        team: Team,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    GameEnded {
        result: WinResult,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::GameStarted { .. } => "game_started",
            EventKind::ActionApplied { .. } => "action_applied",
            EventKind::ActionRejected { .. } => "action_rejected",
            EventKind::VotesTallied { .. } => "votes_tallied",
            EventKind::PlayerEliminated { .. } => "player_eliminated",
            EventKind::KillPrevented { .. } => "kill_prevented",
            EventKind::InvestigationResolved { .. } => "investigation_resolved",
            EventKind::PhaseChanged { .. } => "phase_changed",
            EventKind::GameEnded { .. } => "game_ended",
        }
    }

    /// Events only the acting player may see.
    pub fn is_private(&self) -> bool {
        match self {
            EventKind::InvestigationResolved { .. } => true,
            EventKind::ActionApplied { action, .. } => action.kind.legal_phase() == Phase::Night,
            EventKind::ActionRejected { .. } => true,
            _ => false,
        }
    }

    /// The player whose action produced this event, if any.
    pub fn actor(&self) -> Option<&str> {
        match self {
            EventKind::ActionApplied { action, .. } => Some(action.actor_id.as_str()),
            EventKind::ActionRejected { attempt, .. } => attempt.actor_id.as_deref(),
            EventKind::InvestigationResolved { actor_id, .. } => Some(actor_id.as_str()),
            _ => None,
        }
    }
}
