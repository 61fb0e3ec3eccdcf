use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use super::{action::ActionKind, player::PlayerId, role::Team};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Day,      // 議論フェーズ
    Voting,   // 投票フェーズ
    Night,    // 夜フェーズ
    Finished, // ゲーム終了
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Day => write!(f, "day"),
            Phase::Voting => write!(f, "voting"),
            Phase::Night => write!(f, "night"),
            Phase::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
    pub cast_at: DateTime<Utc>,
}

/// A night ability waiting for the night to be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub target_id: PlayerId,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub eliminated_player: Option<PlayerId>,
    pub is_tie: bool,
    pub counts: BTreeMap<PlayerId, usize>,
}

impl VoteTally {
    /// Strictly highest count is eliminated; a shared maximum eliminates nobody.
    pub fn from_counts(counts: BTreeMap<PlayerId, usize>) -> Self {
        let Some(&top) = counts.values().max() else {
            return Self {
                eliminated_player: None,
                is_tie: false,
                counts,
            };
        };

        let mut leaders = counts
            .iter()
            .filter(|(_, count)| **count == top)
            .map(|(id, _)| id);
        let first = leaders.next().cloned();
        let is_tie = leaders.next().is_some();

        Self {
            eliminated_player: if is_tie { None } else { first },
            is_tie,
            counts,
        }
    }

    pub fn total_votes(&self) -> usize {
        self.counts.values().sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinningTeam {
    Villagers,
    Mafia,
    Draw,
}

impl From<Team> for WinningTeam {
    fn from(team: Team) -> Self {
        match team {
            Team::Villagers => WinningTeam::Villagers,
            Team::Mafia => WinningTeam::Mafia,
        }
    }
}

impl fmt::Display for WinningTeam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinningTeam::Villagers => write!(f, "villagers"),
            WinningTeam::Mafia => write!(f, "mafia"),
            WinningTeam::Draw => write!(f, "draw"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinResult {
    pub winning_team: WinningTeam,
    pub winning_players: Vec<PlayerId>,
    pub reason: String,
}

impl WinResult {
    pub fn draw(reason: impl Into<String>) -> Self {
        Self {
            winning_team: WinningTeam::Draw,
            winning_players: Vec::new(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub previous: Phase,
    pub new: Phase,
}

impl PhaseTransition {
    pub fn is_noop(&self) -> bool {
        self.previous == self.new
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationCause {
    Vote,
    NightKill,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> BTreeMap<PlayerId, usize> {
        pairs.iter().map(|(id, c)| (id.to_string(), *c)).collect()
    }

    #[test]
    fn strict_leader_is_eliminated() {
        let tally = VoteTally::from_counts(counts(&[("a", 1), ("b", 3), ("c", 2)]));
        assert_eq!(tally.eliminated_player.as_deref(), Some("b"));
        assert!(!tally.is_tie);
        assert_eq!(tally.total_votes(), 6);
    }

    #[test]
    fn shared_maximum_is_a_tie() {
        let tally = VoteTally::from_counts(counts(&[("a", 2), ("b", 2), ("c", 1)]));
        assert_eq!(tally.eliminated_player, None);
        assert!(tally.is_tie);
    }

    #[test]
    fn empty_tally_is_not_a_tie() {
        let tally = VoteTally::from_counts(BTreeMap::new());
        assert_eq!(tally.eliminated_player, None);
        assert!(!tally.is_tie);
    }
}
