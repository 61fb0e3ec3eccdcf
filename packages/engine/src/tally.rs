use std::collections::{BTreeMap, HashSet};

use crate::{
    models::{Vote, VoteTally},
    state::GameState,
};

impl GameState {
    /// The latest vote of every living voter, in the order they were cast.
    pub fn active_votes(&self) -> Vec<&Vote> {
        let mut seen = HashSet::new();
        let mut latest: Vec<&Vote> = self
            .votes
            .iter()
            .rev()
            .filter(|v| self.is_alive(&v.voter_id))
            .filter(|v| seen.insert(v.voter_id.as_str()))
            .collect();
        latest.reverse();
        latest
    }

    /// Counts the active votes. Pure read; eliminations happen when the
    /// voting phase is advanced.
    pub fn tally_votes(&self) -> VoteTally {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for vote in self.active_votes() {
            *counts.entry(vote.target_id.clone()).or_default() += 1;
        }
        VoteTally::from_counts(counts)
    }
}
