use serde::{Deserialize, Serialize};

use super::{action::ActionKind, game::Phase, role::Role};

pub const DEFAULT_MAX_PLAYERS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: usize,
}

impl RoleCount {
    pub fn new(role: Role, count: usize) -> Self {
        Self { role, count }
    }
}

/// Which abilities may be aimed at the acting player themself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingRules {
    pub allow_self_vote: bool,
    pub allow_self_heal: bool,
    pub allow_self_protect: bool,
    pub allow_self_investigate: bool,
    pub allow_self_kill: bool,
    /// Whether mafia may aim a kill at another mafia member.
    pub allow_mafia_target_mafia: bool,
}

impl Default for TargetingRules {
    fn default() -> Self {
        Self {
            allow_self_vote: false,
            allow_self_heal: true,
            allow_self_protect: false,
            allow_self_investigate: false,
            allow_self_kill: false,
            allow_mafia_target_mafia: false,
        }
    }
}

impl TargetingRules {
    pub fn allows_self(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Vote => self.allow_self_vote,
            ActionKind::Heal => self.allow_self_heal,
            ActionKind::Protect => self.allow_self_protect,
            ActionKind::Investigate => self.allow_self_investigate,
            ActionKind::Kill => self.allow_self_kill,
        }
    }
}

/// Per-match configuration. Immutable once the game has been initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub max_players: usize,
    /// Passed through to clients; the engine never reads it.
    pub enable_voice_chat: bool,
    pub day_phase_duration_ms: u64,
    pub night_phase_duration_ms: u64,
    pub voting_duration_ms: u64,
    pub roles: Vec<RoleCount>,
    pub targeting: TargetingRules,
    /// How far ahead of the server clock an action timestamp may lie.
    pub max_clock_skew_ms: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            enable_voice_chat: false,
            day_phase_duration_ms: 180_000,
            night_phase_duration_ms: 60_000,
            voting_duration_ms: 60_000,
            roles: Vec::new(),
            targeting: TargetingRules::default(),
            max_clock_skew_ms: 0,
        }
    }
}

impl GameSettings {
    pub fn with_roles(roles: Vec<RoleCount>) -> Self {
        Self {
            roles,
            ..Self::default()
        }
    }

    /// A balanced table for `player_count` seats: one mafia per four players,
    /// with doctor, detective and bodyguard joining as the table grows.
    pub fn for_player_count(player_count: usize) -> Self {
        let mafia = (player_count / 4).max(1);
        let mut roles = vec![RoleCount::new(Role::Mafia, mafia)];
        let mut special = 0;
        for (role, min_players) in [
            (Role::Doctor, 5),
            (Role::Detective, 6),
            (Role::Bodyguard, 8),
        ] {
            if player_count >= min_players {
                roles.push(RoleCount::new(role, 1));
                special += 1;
            }
        }
        let villagers = player_count.saturating_sub(mafia + special);
        roles.push(RoleCount::new(Role::Villager, villagers));

        Self {
            max_players: player_count.max(DEFAULT_MAX_PLAYERS),
            roles,
            ..Self::default()
        }
    }

    pub fn total_roles(&self) -> usize {
        self.roles.iter().map(|r| r.count).sum()
    }

    pub fn count_of(&self, role: Role) -> usize {
        self.roles
            .iter()
            .filter(|r| r.role == role)
            .map(|r| r.count)
            .sum()
    }

    pub fn antagonist_count(&self) -> usize {
        self.roles
            .iter()
            .filter(|r| r.role.is_antagonist())
            .map(|r| r.count)
            .sum()
    }

    /// The full role multiset in declaration order.
    pub fn role_pool(&self) -> Vec<Role> {
        self.roles
            .iter()
            .flat_map(|r| std::iter::repeat(r.role).take(r.count))
            .collect()
    }

    pub fn phase_duration_ms(&self, phase: Phase) -> Option<u64> {
        match phase {
            Phase::Day => Some(self.day_phase_duration_ms),
            Phase::Voting => Some(self.voting_duration_ms),
            Phase::Night => Some(self.night_phase_duration_ms),
            Phase::Finished => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommended_tables_always_fill_every_seat() {
        for n in 3..=20 {
            let settings = GameSettings::for_player_count(n);
            assert_eq!(settings.total_roles(), n, "{n} players");
            assert!(settings.antagonist_count() >= 1);
            assert!(settings.antagonist_count() < n);
            assert!(settings.max_players >= n);
        }
    }

    #[test]
    fn recommended_table_for_eight() {
        let settings = GameSettings::for_player_count(8);
        assert_eq!(settings.count_of(Role::Mafia), 2);
        assert_eq!(settings.count_of(Role::Doctor), 1);
        assert_eq!(settings.count_of(Role::Detective), 1);
        assert_eq!(settings.count_of(Role::Bodyguard), 1);
        assert_eq!(settings.count_of(Role::Villager), 3);
    }

    #[test]
    fn role_pool_expands_counts() {
        let settings = GameSettings::with_roles(vec![
            RoleCount::new(Role::Mafia, 2),
            RoleCount::new(Role::Doctor, 0),
            RoleCount::new(Role::Villager, 3),
        ]);
        let pool = settings.role_pool();
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.iter().filter(|r| **r == Role::Mafia).count(), 2);
        assert!(!pool.contains(&Role::Doctor));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: GameSettings =
            serde_json::from_str(r#"{"roles":[{"role":"mafia","count":1},{"role":"villager","count":2}],"targeting":{"allow_self_protect":true}}"#)
                .unwrap();
        assert_eq!(settings.max_players, DEFAULT_MAX_PLAYERS);
        assert!(settings.targeting.allow_self_protect);
        assert!(settings.targeting.allow_self_heal);
        assert!(!settings.targeting.allow_self_vote);
    }
}
