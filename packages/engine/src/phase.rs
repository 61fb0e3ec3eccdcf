use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::{
    models::{ActionKind, EliminationCause, EventKind, Phase, PhaseTransition, WinResult},
    state::GameState,
};

impl GameState {
    /// Steps the cycle Day → Voting → Night → Day.
    ///
    /// Leaving Voting resolves the vote; leaving Night resolves the pending
    /// abilities. Either may end the game. Once finished this is a no-op, so
    /// a late timer tick is harmless.
    pub fn advance_phase(&mut self) -> PhaseTransition {
        self.advance_phase_at(Utc::now())
    }

    pub fn advance_phase_at(&mut self, now: DateTime<Utc>) -> PhaseTransition {
        let previous = self.phase;
        let frozen = PhaseTransition {
            previous,
            new: previous,
        };
        if self.is_finished() {
            return frozen;
        }

        let next = match previous {
            Phase::Day => Phase::Voting,
            Phase::Voting => {
                self.resolve_votes(now);
                Phase::Night
            }
            Phase::Night => {
                self.resolve_night(now);
                Phase::Day
            }
            Phase::Finished => return frozen,
        };

        if previous != Phase::Day {
            if let Some(result) = self.check_win_conditions() {
                self.finish(result, now);
                return PhaseTransition {
                    previous,
                    new: Phase::Finished,
                };
            }
        }

        if next == Phase::Day {
            self.day_number += 1;
        }
        self.phase = next;
        self.record(
            now,
            EventKind::PhaseChanged {
                from: previous,
                to: next,
            },
        );
        debug!(from = %previous, to = %next, day = self.day_number, "phase advanced");

        PhaseTransition {
            previous,
            new: next,
        }
    }

    /// Stops the game early as a draw. Returns false if it was already over.
    pub fn end_game(&mut self, reason: &str) -> bool {
        self.end_game_at(reason, Utc::now())
    }

    pub fn end_game_at(&mut self, reason: &str, now: DateTime<Utc>) -> bool {
        if self.is_finished() {
            return false;
        }
        self.finish(WinResult::draw(reason), now);
        true
    }

    fn resolve_votes(&mut self, now: DateTime<Utc>) {
        let tally = self.tally_votes();
        let eliminated = tally.eliminated_player.clone();
        self.record(now, EventKind::VotesTallied { tally });

        if let Some(player_id) = eliminated {
            self.eliminate(&player_id, EliminationCause::Vote, now);
        }
        // 投票は翌日に持ち越さない
        self.votes.clear();
    }

    /// Protect and heal land before any kill, so a shielded target survives.
    fn resolve_night(&mut self, now: DateTime<Utc>) {
        let pending = std::mem::take(&mut self.pending_actions);

        for kind in [ActionKind::Protect, ActionKind::Heal] {
            for action in pending.values().filter(|a| a.kind == kind) {
                if let Some(target) = self.player_mut(&action.target_id) {
                    match kind {
                        ActionKind::Protect => target.protected_this_night = true,
                        _ => target.healed_this_night = true,
                    }
                }
            }
        }

        for (actor_id, action) in pending.iter().filter(|(_, a)| a.kind == ActionKind::Investigate) {
            if let Some(team) = self.player(&action.target_id).map(|p| p.role.team()) {
                self.record(
                    now,
                    EventKind::InvestigationResolved {
                        actor_id: actor_id.clone(),
                        target_id: action.target_id.clone(),
                        team,
                    },
                );
            }
        }

        // 複数の人狼が同じ相手を狙っても一度だけ処理する
        let kill_targets: BTreeSet<&str> = pending
            .values()
            .filter(|a| a.kind == ActionKind::Kill)
            .map(|a| a.target_id.as_str())
            .collect();
        for target_id in kill_targets {
            let Some(target) = self.player(target_id) else {
                continue;
            };
            if !target.is_alive {
                continue;
            }
            if target.is_shielded() {
                self.record(
                    now,
                    EventKind::KillPrevented {
                        target_id: target_id.to_string(),
                    },
                );
            } else {
                self.eliminate(target_id, EliminationCause::NightKill, now);
            }
        }

        for player in &mut self.players {
            player.protected_this_night = false;
            player.healed_this_night = false;
        }
    }

    fn eliminate(&mut self, player_id: &str, cause: EliminationCause, now: DateTime<Utc>) {
        let Some(player) = self.player_mut(player_id) else {
            return;
        };
        player.is_alive = false;
        let role = player.role;
        info!(player = player_id, %role, ?cause, "player eliminated");
        self.record(
            now,
            EventKind::PlayerEliminated {
                player_id: player_id.to_string(),
                role,
                cause,
            },
        );
    }

    fn finish(&mut self, result: WinResult, now: DateTime<Utc>) {
        info!(winner = %result.winning_team, reason = %result.reason, "game finished");
        self.phase = Phase::Finished;
        self.record(
            now,
            EventKind::GameEnded {
                result: result.clone(),
            },
        );
        self.win_result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        models::{PlayerAction, Role, WinningTeam},
        state::fixtures::{game_with, kill, standard_game},
    };

    use super::*;

    fn act(state: &mut GameState, kind: ActionKind, actor: &str, target: &str) {
        let now = Utc::now();
        state
            .process_action_at(&PlayerAction::new(kind, actor, target, now), now)
            .unwrap();
    }

    fn at_night() -> GameState {
        let mut state = standard_game();
        state.phase = Phase::Night;
        state
    }

    #[test]
    fn cycles_through_phases_and_counts_days() {
        let mut state = standard_game();
        assert_eq!(
            state.advance_phase(),
            PhaseTransition {
                previous: Phase::Day,
                new: Phase::Voting
            }
        );
        assert_eq!(state.advance_phase().new, Phase::Night);
        assert_eq!(state.day_number(), 1);
        assert_eq!(state.advance_phase().new, Phase::Day);
        assert_eq!(state.day_number(), 2);
        assert_eq!(state.phase(), Phase::Day);
    }

    #[test]
    fn voting_eliminates_and_clears_votes() {
        let mut state = standard_game();
        state.phase = Phase::Voting;
        for voter in ["m1", "doc", "det", "bg"] {
            act(&mut state, ActionKind::Vote, voter, "v1");
        }
        act(&mut state, ActionKind::Vote, "v1", "m1");

        let transition = state.advance_phase();
        assert_eq!(transition.new, Phase::Night);
        assert!(!state.is_alive("v1"));
        assert!(state.votes().is_empty());
        assert!(state.events().iter().any(|e| matches!(
            &e.kind,
            EventKind::PlayerEliminated { player_id, cause: EliminationCause::Vote, .. } if player_id == "v1"
        )));
    }

    #[test]
    fn tied_vote_eliminates_nobody() {
        let mut state = standard_game();
        state.phase = Phase::Voting;
        act(&mut state, ActionKind::Vote, "v1", "m1");
        act(&mut state, ActionKind::Vote, "v2", "m2");

        state.advance_phase();
        assert_eq!(state.living_players().count(), 7);
        assert_eq!(state.phase(), Phase::Night);
    }

    #[test]
    fn healed_target_survives_the_kill() {
        let mut state = at_night();
        act(&mut state, ActionKind::Kill, "m1", "v1");
        act(&mut state, ActionKind::Heal, "doc", "v1");

        state.advance_phase();
        assert!(state.is_alive("v1"));
        assert!(state
            .events()
            .iter()
            .any(|e| matches!(&e.kind, EventKind::KillPrevented { target_id } if target_id == "v1")));
    }

    #[test]
    fn protected_target_survives_the_kill() {
        let mut state = at_night();
        act(&mut state, ActionKind::Kill, "m1", "v2");
        act(&mut state, ActionKind::Kill, "m2", "v2");
        act(&mut state, ActionKind::Protect, "bg", "v2");

        state.advance_phase();
        assert!(state.is_alive("v2"));
    }

    #[test]
    fn unshielded_target_dies_and_flags_reset() {
        let mut state = at_night();
        act(&mut state, ActionKind::Kill, "m1", "v1");
        act(&mut state, ActionKind::Heal, "doc", "v2");
        act(&mut state, ActionKind::Protect, "bg", "det");

        let transition = state.advance_phase();
        assert_eq!(transition.new, Phase::Day);
        assert!(!state.is_alive("v1"));
        assert!(state.pending_actions().is_empty());
        assert!(state.players().iter().all(|p| !p.is_shielded()));
        assert_eq!(state.day_number(), 2);
    }

    #[test]
    fn split_mafia_kills_each_land() {
        let mut state = at_night();
        act(&mut state, ActionKind::Kill, "m1", "v1");
        act(&mut state, ActionKind::Kill, "m2", "v2");

        state.advance_phase();
        assert!(!state.is_alive("v1"));
        assert!(!state.is_alive("v2"));
    }

    #[test]
    fn investigation_reports_the_team() {
        let mut state = at_night();
        act(&mut state, ActionKind::Investigate, "det", "m2");

        state.advance_phase();
        let found = state.events().iter().find_map(|e| match &e.kind {
            EventKind::InvestigationResolved { actor_id, team, .. } if actor_id == "det" => {
                Some(*team)
            }
            _ => None,
        });
        assert_eq!(found, Some(crate::models::Team::Mafia));
    }

    #[test]
    fn night_kill_can_end_the_game() {
        let mut state = game_with(&[
            ("m", Role::Mafia),
            ("a", Role::Villager),
            ("b", Role::Villager),
        ]);
        state.phase = Phase::Night;
        act(&mut state, ActionKind::Kill, "m", "a");

        let transition = state.advance_phase();
        assert_eq!(transition.new, Phase::Finished);
        assert_eq!(state.phase(), Phase::Finished);
        assert_eq!(
            state.win_result().unwrap().winning_team,
            WinningTeam::Mafia
        );
        // day counter does not move on a game-ending night
        assert_eq!(state.day_number(), 1);
    }

    #[test]
    fn voting_out_the_last_mafia_ends_the_game() {
        let mut state = standard_game();
        kill(&mut state, "m2");
        state.phase = Phase::Voting;
        for voter in ["doc", "det", "bg", "v1", "v2"] {
            act(&mut state, ActionKind::Vote, voter, "m1");
        }

        let transition = state.advance_phase();
        assert_eq!(
            transition,
            PhaseTransition {
                previous: Phase::Voting,
                new: Phase::Finished
            }
        );
        assert_eq!(
            state.win_result().unwrap().winning_team,
            WinningTeam::Villagers
        );
        assert!(matches!(
            state.events().last().unwrap().kind,
            EventKind::GameEnded { .. }
        ));
    }

    #[test]
    fn advancing_a_finished_game_is_a_noop() {
        let mut state = standard_game();
        state.end_game("host left");
        let frozen = state.clone();

        for _ in 0..3 {
            let transition = state.advance_phase();
            assert!(transition.is_noop());
            assert_eq!(transition.new, Phase::Finished);
        }
        assert_eq!(state, frozen);
        assert!(!state.end_game("again"));
    }

    #[test]
    fn day_does_not_evaluate_wins() {
        let mut state = standard_game();
        for id in ["doc", "det", "bg"] {
            kill(&mut state, id);
        }
        // parity reached outside a checkpoint: the day still moves on to voting
        assert_eq!(state.advance_phase().new, Phase::Voting);
        assert!(state.win_result().is_none());
    }
}
