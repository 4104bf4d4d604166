use rand::Rng;

use super::{Backend, MemoryBackend};
use crate::error::{Error, Result};
use crate::model::bigram_model::TableStats;

/// Memory backend that fails on the n-th staged increment or on commit.
pub(crate) struct FaultyBackend {
	inner: MemoryBackend,
	pub fail_on_stage: Option<usize>,
	pub fail_on_commit: bool,
	staged: usize,
}

impl FaultyBackend {
	pub fn new() -> Self {
		Self { inner: MemoryBackend::new(), fail_on_stage: None, fail_on_commit: false, staged: 0 }
	}
}

impl Backend for FaultyBackend {
	fn upsert_increment(&mut self, current: &str, next: &str) -> Result<()> {
		self.inner.upsert_increment(current, next)
	}

	fn begin(&mut self) -> Result<()> {
		self.staged = 0;
		self.inner.begin()
	}

	fn stage_increment(&mut self, current: &str, next: &str) -> Result<()> {
		self.staged += 1;
		if self.fail_on_stage == Some(self.staged) {
			return Err(Error::storage("staging", "injected failure"));
		}
		self.inner.stage_increment(current, next)
	}

	fn commit(&mut self) -> Result<()> {
		if self.fail_on_commit {
			self.inner.rollback();
			return Err(Error::storage("commit", "injected failure"));
		}
		self.inner.commit()
	}

	fn rollback(&mut self) {
		self.inner.rollback()
	}

	fn scan(&self, current: &str) -> Result<Vec<(String, u64)>> {
		self.inner.scan(current)
	}

	fn random_current<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<String>> {
		self.inner.random_current(rng)
	}

	fn truncate(&mut self) -> Result<()> {
		self.inner.truncate()
	}

	fn stats(&self) -> Result<TableStats> {
		self.inner.stats()
	}
}
