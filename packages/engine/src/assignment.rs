use chrono::Utc;
use rand::{seq::SliceRandom, Rng};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

use crate::{
    error::ConfigError,
    models::{EventKind, GameSettings, Phase, Player, PlayerState},
    state::GameState,
    MIN_PLAYERS,
};

impl GameState {
    /// Deals roles to `players` and opens day 1.
    pub fn initialize(players: Vec<Player>, settings: GameSettings) -> Result<Self, ConfigError> {
        Self::initialize_with_rng(players, settings, &mut rand::thread_rng())
    }

    /// Same as [`GameState::initialize`] with a caller-supplied RNG, so a
    /// seeded generator reproduces the same deal.
    pub fn initialize_with_rng<R: Rng + ?Sized>(
        players: Vec<Player>,
        settings: GameSettings,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        validate_table(&players, &settings)?;

        let mut roles = settings.role_pool();
        roles.shuffle(rng);

        let players: Vec<PlayerState> = players
            .into_iter()
            .zip(roles)
            .map(|(player, role)| PlayerState::new(player, role))
            .collect();
        let player_count = players.len();

        let mut state = GameState {
            players,
            phase: Phase::Day,
            day_number: 1,
            votes: Vec::new(),
            pending_actions: BTreeMap::new(),
            events: Vec::new(),
            win_result: None,
            settings,
        };
        let roles = state.settings.roles.clone();
        state.record(Utc::now(), EventKind::GameStarted { player_count, roles });

        info!(
            players = player_count,
            mafia = state.settings.antagonist_count(),
            "game initialized"
        );
        Ok(state)
    }
}

fn validate_table(players: &[Player], settings: &GameSettings) -> Result<(), ConfigError> {
    let actual = players.len();
    if actual < MIN_PLAYERS {
        return Err(ConfigError::TooFewPlayers {
            min: MIN_PLAYERS,
            actual,
        });
    }
    if actual > settings.max_players {
        return Err(ConfigError::TooManyPlayers {
            max: settings.max_players,
            actual,
        });
    }

    let mut seen = HashSet::with_capacity(actual);
    if let Some(dup) = players.iter().find(|p| !seen.insert(p.id.as_str())) {
        return Err(ConfigError::DuplicatePlayer(dup.id.clone()));
    }

    let roles = settings.total_roles();
    if roles != actual {
        return Err(ConfigError::RoleCountMismatch {
            roles,
            players: actual,
        });
    }

    match settings.antagonist_count() {
        0 => Err(ConfigError::NoAntagonists),
        mafia if mafia == actual => Err(ConfigError::OnlyAntagonists),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, RoleCount};
    use rand::{rngs::StdRng, SeedableRng};

    fn players(n: usize) -> Vec<Player> {
        (1..=n)
            .map(|i| Player::new(i.to_string(), format!("Player {i}")))
            .collect()
    }

    fn settings(mafia: usize, villagers: usize) -> GameSettings {
        GameSettings::with_roles(vec![
            RoleCount::new(Role::Mafia, mafia),
            RoleCount::new(Role::Villager, villagers),
        ])
    }

    #[test]
    fn opens_on_day_one_with_a_single_start_event() {
        let state = GameState::initialize(players(4), settings(1, 3)).unwrap();
        assert_eq!(state.phase(), Phase::Day);
        assert_eq!(state.day_number(), 1);
        assert!(state.votes().is_empty());
        assert!(state.pending_actions().is_empty());
        assert!(state.win_result().is_none());
        assert_eq!(state.events().len(), 1);
        assert!(matches!(
            state.events()[0].kind,
            EventKind::GameStarted { player_count: 4, .. }
        ));
        assert!(state.players().iter().all(|p| p.is_alive));
    }

    #[test]
    fn keeps_seating_order() {
        let state = GameState::initialize(players(5), settings(1, 4)).unwrap();
        let ids: Vec<&str> = state.players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn same_seed_same_deal() {
        let deal = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            GameState::initialize_with_rng(players(8), GameSettings::for_player_count(8), &mut rng)
                .unwrap()
                .players()
                .iter()
                .map(|p| p.role)
                .collect::<Vec<_>>()
        };
        assert_eq!(deal(7), deal(7));
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(
            GameState::initialize(players(4), settings(1, 2)).unwrap_err(),
            ConfigError::RoleCountMismatch {
                roles: 3,
                players: 4
            }
        );
        assert_eq!(
            GameState::initialize(players(4), settings(0, 4)).unwrap_err(),
            ConfigError::NoAntagonists
        );
        assert_eq!(
            GameState::initialize(players(4), settings(4, 0)).unwrap_err(),
            ConfigError::OnlyAntagonists
        );
        assert_eq!(
            GameState::initialize(players(2), settings(1, 1)).unwrap_err(),
            ConfigError::TooFewPlayers { min: 3, actual: 2 }
        );

        let mut small_room = settings(1, 9);
        small_room.max_players = 9;
        assert_eq!(
            GameState::initialize(players(10), small_room).unwrap_err(),
            ConfigError::TooManyPlayers { max: 9, actual: 10 }
        );
    }

    #[test]
    fn rejects_duplicate_seats() {
        let mut seats = players(3);
        seats.push(Player::new("2", "Impostor"));
        assert_eq!(
            GameState::initialize(seats, settings(1, 3)).unwrap_err(),
            ConfigError::DuplicatePlayer("2".to_string())
        );
    }
}
