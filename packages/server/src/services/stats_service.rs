use std::collections::HashMap;

use game_engine::{ActionKind, Applied, EventKind, GameState, Role};
use serde::{Deserialize, Serialize};

/// Per-player outcome of a finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: String,
    pub name: String,
    pub role: Role,
    pub votes_cast: usize,
    pub votes_received: usize,
    pub eliminated_on_day: Option<u32>,
    pub won: bool,
}

#[derive(Default)]
struct Tally {
    votes_cast: usize,
    votes_received: usize,
    eliminated_on_day: Option<u32>,
    won: bool,
}

/// Builds the summary from the event log. A changed vote counts once;
/// only ballots still standing when the vote closed count as received.
pub fn summarize(state: &GameState) -> Vec<PlayerSummary> {
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for event in state.events() {
        match &event.kind {
            EventKind::ActionApplied { action, applied }
                if action.kind == ActionKind::Vote && *applied == Applied::Recorded =>
            {
                tallies.entry(&action.actor_id).or_default().votes_cast += 1;
            }
            EventKind::VotesTallied { tally } => {
                for (target, count) in &tally.counts {
                    tallies.entry(target).or_default().votes_received += count;
                }
            }
            EventKind::PlayerEliminated { player_id, .. } => {
                tallies.entry(player_id).or_default().eliminated_on_day = Some(event.day_number);
            }
            EventKind::GameEnded { result } => {
                for player_id in &result.winning_players {
                    tallies.entry(player_id).or_default().won = true;
                }
            }
            _ => {}
        }
    }

    state
        .players()
        .iter()
        .map(|p| {
            let tally = tallies.remove(p.id.as_str()).unwrap_or_default();
            PlayerSummary {
                player_id: p.id.clone(),
                name: p.name.clone(),
                role: p.role,
                votes_cast: tally.votes_cast,
                votes_received: tally.votes_received,
                eliminated_on_day: tally.eliminated_on_day,
                won: tally.won,
            }
        })
        .collect()
}
