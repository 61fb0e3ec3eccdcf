use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::models::{
    EventKind, GameEvent, GameSettings, PendingAction, Phase, PlayerId, PlayerState, PlayerView,
    PublicPlayer, Vote, WinResult,
};

/// The whole mutable state of one match.
///
/// Created by [`GameState::initialize`], mutated by [`GameState::process_action`]
/// and [`GameState::advance_phase`], and frozen once `win_result` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub(crate) players: Vec<PlayerState>,
    pub(crate) phase: Phase,
    pub(crate) day_number: u32,
    pub(crate) votes: Vec<Vote>,
    pub(crate) pending_actions: BTreeMap<PlayerId, PendingAction>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) win_result: Option<WinResult>,
    pub(crate) settings: GameSettings,
}

impl GameState {
    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn day_number(&self) -> u32 {
        self.day_number
    }

    /// Full vote history of the current voting phase, superseded votes included.
    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn pending_actions(&self) -> &BTreeMap<PlayerId, PendingAction> {
        &self.pending_actions
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn win_result(&self) -> Option<&WinResult> {
        self.win_result.as_ref()
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn is_finished(&self) -> bool {
        self.win_result.is_some()
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub(crate) fn player_mut(&mut self, player_id: &str) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn is_alive(&self, player_id: &str) -> bool {
        self.player(player_id).is_some_and(|p| p.is_alive)
    }

    pub fn living_players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.iter().filter(|p| p.is_alive)
    }

    /// Whether every living player who owes an action this phase has submitted one.
    ///
    /// Day has no required actions and is never "ready"; the caller's timer
    /// decides when discussion ends.
    pub fn ready_to_advance(&self) -> bool {
        match self.phase {
            Phase::Voting => {
                let voted: HashSet<&str> = self
                    .active_votes()
                    .into_iter()
                    .map(|v| v.voter_id.as_str())
                    .collect();
                self.living_players().all(|p| voted.contains(p.id.as_str()))
            }
            Phase::Night => self
                .living_players()
                .filter(|p| p.role.night_ability().is_some())
                .all(|p| self.pending_actions.contains_key(&p.id)),
            Phase::Day | Phase::Finished => false,
        }
    }

    /// The game as seen from one seat.
    pub fn view_for(&self, viewer_id: &str) -> PlayerView {
        let viewer = self.player(viewer_id);
        let viewer_is_mafia = viewer.is_some_and(|p| p.role.is_antagonist());
        let reveal_all = self.is_finished();

        let players = self
            .players
            .iter()
            .map(|p| {
                let visible = reveal_all
                    || !p.is_alive
                    || p.id == viewer_id
                    || (viewer_is_mafia && p.role.is_antagonist());
                PublicPlayer {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    is_alive: p.is_alive,
                    role: visible.then_some(p.role),
                }
            })
            .collect();

        PlayerView {
            viewer_id: viewer_id.to_string(),
            your_role: viewer.map(|p| p.role),
            phase: self.phase,
            day_number: self.day_number,
            players,
            votes: self.active_votes().into_iter().cloned().collect(),
            win_result: self.win_result.clone(),
        }
    }

    /// Events the given player is allowed to read: all public events plus
    /// private ones they caused.
    pub fn events_for(&self, viewer_id: &str) -> Vec<&GameEvent> {
        self.events
            .iter()
            .filter(|e| !e.kind.is_private() || e.kind.actor() == Some(viewer_id))
            .collect()
    }

    pub(crate) fn record(&mut self, at: DateTime<Utc>, kind: EventKind) {
        let sequence = self.events.len() as u64;
        self.events.push(GameEvent {
            sequence,
            day_number: self.day_number,
            phase: self.phase,
            at,
            kind,
        });
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::{ActionKind, PlayerAction, Role};

    #[test]
    fn villager_view_hides_living_roles() {
        let mut state = standard_game();
        kill(&mut state, "m2");
        let view = state.view_for("v1");

        assert_eq!(view.your_role, Some(Role::Villager));
        let role_of = |id: &str| view.players.iter().find(|p| p.id == id).unwrap().role;
        assert_eq!(role_of("v1"), Some(Role::Villager));
        assert_eq!(role_of("m1"), None);
        assert_eq!(role_of("m2"), Some(Role::Mafia));
        assert_eq!(role_of("doc"), None);
    }

    #[test]
    fn mafia_see_each_other() {
        let state = standard_game();
        let view = state.view_for("m1");
        let role_of = |id: &str| view.players.iter().find(|p| p.id == id).unwrap().role;
        assert_eq!(role_of("m2"), Some(Role::Mafia));
        assert_eq!(role_of("det"), None);
    }

    #[test]
    fn night_is_ready_once_every_ability_holder_acted() {
        let mut state = standard_game();
        state.phase = Phase::Night;
        let now = Utc::now();
        assert!(!state.ready_to_advance());

        for (actor, kind, target) in [
            ("m1", ActionKind::Kill, "v1"),
            ("m2", ActionKind::Kill, "v1"),
            ("doc", ActionKind::Heal, "v2"),
            ("det", ActionKind::Investigate, "m1"),
        ] {
            state
                .process_action_at(&PlayerAction::new(kind, actor, target, now), now)
                .unwrap();
        }
        assert!(!state.ready_to_advance());

        state
            .process_action_at(&PlayerAction::new(ActionKind::Protect, "bg", "v2", now), now)
            .unwrap();
        assert!(state.ready_to_advance());
    }

    #[test]
    fn day_is_never_ready() {
        let state = standard_game();
        assert!(!state.ready_to_advance());
    }

    #[test]
    fn private_events_are_only_visible_to_their_actor() {
        let mut state = standard_game();
        state.phase = Phase::Night;
        let now = Utc::now();
        state
            .process_action_at(&PlayerAction::new(ActionKind::Kill, "m1", "v1", now), now)
            .unwrap();

        assert_eq!(state.events_for("m1").len(), 2);
        assert_eq!(state.events_for("v1").len(), 1);
    }
}
