use super::state::State;
use rand::Rng;
use rand::prelude::IteratorRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary counters of a transition table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
	/// Distinct `current` words.
	pub currents: usize,
	/// Distinct `(current, next)` records.
	pub transitions: usize,
	/// Sum of every record's count.
	pub observations: u64,
}

/// First-order word transition table.
///
/// The `BigramModel` stores one `State` per `current` word and is the
/// in-memory image every backend keeps of its records.
///
/// # Invariants
/// - No state is empty: a `current` exists only once it has a follower
/// - All transition counts are >= 1
///
/// Words are kept in ordered maps so that iteration (and therefore a
/// seeded random walk) is reproducible across runs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct BigramModel {
	states: BTreeMap<String, State>,
}

impl BigramModel {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `by` observations of `current -> next`.
	pub fn add_transition(&mut self, current: &str, next: &str, by: u64) {
		if by == 0 {
			return;
		}
		let state = self.states.entry(current.to_owned()).or_default();
		state.add_transition(next, by);
	}

	/// Returns every `(next, count)` observed after `current`.
	///
	/// Empty if `current` was never seen as a first word.
	pub fn followers(&self, current: &str) -> Vec<(String, u64)> {
		self.states.get(current).map(State::followers).unwrap_or_default()
	}

	pub fn count(&self, current: &str, next: &str) -> u64 {
		self.states.get(current).map_or(0, |state| state.count(next))
	}

	/// Returns a uniformly chosen `current` word.
	///
	/// Every distinct word has the same chance regardless of how many
	/// transitions it owns. Returns `None` if the model has no states.
	pub fn random_current<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
		self.states.keys().choose(rng).cloned()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}

	pub fn clear(&mut self) {
		self.states.clear();
	}

	pub fn stats(&self) -> TableStats {
		self.states.values().fold(TableStats::default(), |mut stats, state| {
			stats.currents += 1;
			stats.transitions += state.len();
			stats.observations += state.total();
			stats
		})
	}
}
