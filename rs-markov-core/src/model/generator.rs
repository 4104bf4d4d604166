use log::debug;
use rand::Rng;

use crate::error::{Error, Result};
use crate::store::{Backend, TransitionStore};
use crate::tokenizer::tokenize;

/// Strategy used to select the first word of a walk.
///
/// # Variants
/// - `Random`: a uniformly random word among those with recorded followers.
/// - `Custom(String)`: the given word, normalized like training input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StartWord {
	#[default]
	Random,
	Custom(String),
}

/// Weighted random walk over a transition store.
///
/// # Responsibilities
/// - Pick a start word (random or custom)
/// - Draw each next word with probability `count / total` among followers
/// - Stop at the requested length or at the first word without followers
///
/// The random source is owned by the generator so a seeded `R` makes the
/// whole walk reproducible.
pub struct Generator<'a, B: Backend, R: Rng> {
	store: &'a TransitionStore<B>,
	rng: R,
}

impl<'a, B: Backend, R: Rng> Generator<'a, B, R> {
	pub fn new(store: &'a TransitionStore<B>, rng: R) -> Self {
		Self { store, rng }
	}

	/// Generates a walk of at most `length` words from a random start.
	///
	/// # Returns
	/// - An empty vector when `length` is 0
	/// - Otherwise between 1 and `length` words; fewer than `length` only
	///   when a word without followers is reached
	///
	/// # Errors
	/// - `EmptyModel` if the store holds no transitions
	/// - `StorageUnavailable` if the store cannot be read
	pub fn generate(&mut self, length: usize) -> Result<Vec<String>> {
		self.generate_from(length, &StartWord::Random)
	}

	/// Same as `generate` with an explicit start strategy.
	///
	/// A custom start word is tokenized like training text and its first
	/// token is used; it does not need to exist in the store (the walk then
	/// ends right after it). Fails with `InvalidToken` if it has no token.
	pub fn generate_from(&mut self, length: usize, start: &StartWord) -> Result<Vec<String>> {
		if length == 0 {
			return Ok(Vec::new());
		}

		let mut current = match start {
			StartWord::Random => self.store.random_key(&mut self.rng).map_err(|e| match e {
				Error::EmptyStore => Error::EmptyModel,
				other => other,
			})?,
			StartWord::Custom(word) => tokenize(word).into_iter().next().ok_or(Error::InvalidToken)?,
		};

		let mut words = Vec::with_capacity(length);
		words.push(current.clone());

		while words.len() < length {
			let followers = self.store.followers(&current)?;
			let Some(next) = self.pick(&followers) else {
				debug!("'{}' has no followers, stopping after {} words", current, words.len());
				break;
			};
			words.push(next.clone());
			current = next;
		}

		Ok(words)
	}

	/// Generates a walk and joins it with single spaces.
	pub fn generate_text(&mut self, length: usize, start: &StartWord) -> Result<String> {
		Ok(self.generate_from(length, start)?.join(" "))
	}

	/// Draws one follower, `None` for a dead end.
	fn pick(&mut self, followers: &[(String, u64)]) -> Option<String> {
		let total: u64 = followers.iter().map(|(_, count)| count).sum();
		if total == 0 {
			return None;
		}

		let r = self.rng.random_range(0..total);
		weighted_choice(followers, r).map(str::to_owned)
	}
}

/// Selects a follower by cumulative subtraction.
///
/// Walks `followers` in the given order, subtracting each count from `r`
/// until `r` falls inside one bucket. With `r` uniform over
/// `[0, total)`, each follower is chosen with probability `count / total`.
///
/// An `r` past the total selects the last follower. Returns `None` only
/// when `followers` is empty.
pub fn weighted_choice(followers: &[(String, u64)], mut r: u64) -> Option<&str> {
	let mut fallback: Option<&str> = None;
	for (next, count) in followers {
		if r < *count {
			return Some(next);
		}
		r -= count;
		fallback = Some(next);
	}

	fallback
}
