use crate::{
    models::{Team, WinResult, WinningTeam},
    state::GameState,
};

impl GameState {
    /// Decides the match from the living players' roles. Does not mutate.
    ///
    /// Mafia win at parity: two mafia facing two villagers is a mafia win,
    /// not a draw.
    pub fn check_win_conditions(&self) -> Option<WinResult> {
        let (mafia, others) = self
            .living_players()
            .fold((0usize, 0usize), |(mafia, others), p| {
                if p.role.is_antagonist() {
                    (mafia + 1, others)
                } else {
                    (mafia, others + 1)
                }
            });

        if mafia + others == 0 {
            Some(WinResult::draw("no players are left alive"))
        } else if mafia == 0 {
            Some(self.win_for(Team::Villagers, "all mafia have been eliminated"))
        } else if mafia >= others {
            Some(self.win_for(Team::Mafia, "mafia equal or outnumber the remaining players"))
        } else {
            None
        }
    }

    fn win_for(&self, team: Team, reason: &str) -> WinResult {
        WinResult {
            winning_team: WinningTeam::from(team),
            winning_players: self
                .players
                .iter()
                .filter(|p| p.role.team() == team)
                .map(|p| p.id.clone())
                .collect(),
            reason: reason.to_string(),
        }
    }
}
