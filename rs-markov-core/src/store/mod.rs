//! Durable `(current, next) -> count` store.
//!
//! `TransitionStore` owns every transition record and enforces the
//! counting contract on top of a pluggable `Backend`:
//! - single increments are applied and persisted one by one
//! - batches go through a `Transaction` and are all-or-nothing
//! - reads never observe a partially applied batch

#[cfg(test)]
pub(crate) mod faulty;
mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::path::Path;

use rand::Rng;

use crate::error::{Error, Result};
use crate::model::bigram_model::TableStats;
use crate::tokenizer::is_valid_token;

/// Minimal table engine consumed by `TransitionStore`.
///
/// Implementations keep one record per `(current, next)` key. Staged
/// increments must stay invisible to every read until `commit` succeeds,
/// and `commit` consumes the staged batch whether it succeeds or not.
pub trait Backend {
	/// Adds one observation of `current -> next` and makes it durable.
	fn upsert_increment(&mut self, current: &str, next: &str) -> Result<()>;

	/// Opens a transaction. Nested transactions are not supported.
	fn begin(&mut self) -> Result<()>;

	/// Stages one observation inside the open transaction.
	fn stage_increment(&mut self, current: &str, next: &str) -> Result<()>;

	/// Applies every staged observation as a single unit.
	fn commit(&mut self) -> Result<()>;

	/// Discards every staged observation. Never fails.
	fn rollback(&mut self);

	/// Returns every `(next, count)` recorded for `current`.
	fn scan(&self, current: &str) -> Result<Vec<(String, u64)>>;

	/// Picks one distinct `current` uniformly, `None` when empty.
	fn random_current<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<String>>;

	/// Deletes every record, leaving the engine ready for new writes.
	fn truncate(&mut self) -> Result<()>;

	fn stats(&self) -> Result<TableStats>;

	/// Compacts whatever the engine buffers for durability.
	fn checkpoint(&mut self) -> Result<()> {
		Ok(())
	}
}

/// Scoped transaction over a backend.
///
/// Dropping the guard without calling `commit` rolls the transaction back,
/// so every early return (including `?`) leaves the store untouched.
pub struct Transaction<'a, B: Backend> {
	backend: &'a mut B,
	finished: bool,
}

impl<'a, B: Backend> Transaction<'a, B> {
	pub fn begin(backend: &'a mut B) -> Result<Self> {
		backend.begin()?;
		Ok(Self { backend, finished: false })
	}

	pub fn increment(&mut self, current: &str, next: &str) -> Result<()> {
		self.backend.stage_increment(current, next)
	}

	pub fn commit(mut self) -> Result<()> {
		self.finished = true;
		self.backend.commit()
	}
}

impl<B: Backend> Drop for Transaction<'_, B> {
	fn drop(&mut self) {
		if !self.finished {
			self.backend.rollback();
		}
	}
}

/// Exclusive owner of all transition records.
#[derive(Debug)]
pub struct TransitionStore<B: Backend> {
	backend: B,
}

impl TransitionStore<FileBackend> {
	/// Opens (or creates) a durable store at `path`.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		Ok(Self::new(FileBackend::open(path)?))
	}
}

impl TransitionStore<MemoryBackend> {
	/// Creates a volatile store, mostly useful for tests and dry runs.
	pub fn in_memory() -> Self {
		Self::new(MemoryBackend::new())
	}
}

impl<B: Backend> TransitionStore<B> {
	pub fn new(backend: B) -> Self {
		Self { backend }
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// Adds one observation of `current -> next`.
	///
	/// Creates the record with a count of 1 when absent. The update is
	/// durable once this returns `Ok`.
	///
	/// # Errors
	/// - `InvalidToken` if either word is empty or `MAX_TOKEN_LEN` characters long or more
	/// - `StorageUnavailable` if the backend cannot persist the update
	pub fn increment(&mut self, current: &str, next: &str) -> Result<()> {
		check_words(current, next)?;
		self.backend.upsert_increment(current, next)
	}

	/// Applies every pair as one all-or-nothing unit.
	///
	/// Final counts are identical to calling `increment` once per pair;
	/// batching only saves round-trips. On failure no increment of the
	/// batch is visible.
	///
	/// # Errors
	/// - `InvalidToken` if any word is out of bounds (nothing is written)
	/// - `StorageUnavailable` if the batch cannot be applied
	pub fn increment_batch(&mut self, pairs: &[(String, String)]) -> Result<()> {
		for (current, next) in pairs {
			check_words(current, next)?;
		}
		if pairs.is_empty() {
			return Ok(());
		}

		let mut transaction = Transaction::begin(&mut self.backend)?;
		for (current, next) in pairs {
			transaction.increment(current, next)?;
		}
		transaction.commit()
	}

	/// Returns every follower of `current` with its count.
	///
	/// The order is unspecified. Empty if `current` was never observed as
	/// a first word.
	pub fn followers(&self, current: &str) -> Result<Vec<(String, u64)>> {
		self.backend.scan(current)
	}

	/// Returns a uniformly random distinct `current` word.
	///
	/// # Errors
	/// - `EmptyStore` when no records exist
	pub fn random_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
		self.backend.random_current(rng)?.ok_or(Error::EmptyStore)
	}

	/// Deletes every record. The store stays usable without reopening.
	pub fn clear(&mut self) -> Result<()> {
		self.backend.truncate()
	}

	pub fn stats(&self) -> Result<TableStats> {
		self.backend.stats()
	}

	pub fn checkpoint(&mut self) -> Result<()> {
		self.backend.checkpoint()
	}
}

fn check_words(current: &str, next: &str) -> Result<()> {
	if !is_valid_token(current) || !is_valid_token(next) {
		return Err(Error::InvalidToken);
	}
	Ok(())
}
