use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Represents one word of the chain and everything observed after it.
///
/// A `State` is stored under its `current` word by `BigramModel` and
/// holds every observed follower together with its occurrence count.
///
/// Conceptually, this is a node in a Markov chain where outgoing edges
/// are weighted by their number of observations.
///
/// ## Invariants
/// - Each transition occurrence count is strictly positive
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct State {
	/// Outgoing transitions indexed by the next word.
	/// Example: { "cat" => 2, "mat" => 1 }
	transitions: BTreeMap<String, u64>,
}

impl State {
	/// Records `by` occurrences of a transition toward `next`.
	///
	/// - If the transition already exists, its occurrence count is increased.
	/// - Otherwise, a new transition is created with a count of `by`.
	pub fn add_transition(&mut self, next: &str, by: u64) {
		if by == 0 {
			return;
		}
		match self.transitions.get_mut(next) {
			Some(count) => *count += by,
			None => {
				self.transitions.insert(next.to_owned(), by);
			}
		}
	}

	/// Occurrence count of `current -> next`, 0 when never seen.
	pub fn count(&self, next: &str) -> u64 {
		self.transitions.get(next).copied().unwrap_or(0)
	}

	/// Every follower with its count.
	pub fn followers(&self) -> Vec<(String, u64)> {
		self.transitions
			.iter()
			.map(|(next, count)| (next.clone(), *count))
			.collect()
	}

	/// Number of distinct followers.
	pub fn len(&self) -> usize {
		self.transitions.len()
	}

	/// Sum of all outgoing occurrence counts.
	pub fn total(&self) -> u64 {
		self.transitions.values().sum()
	}
}
