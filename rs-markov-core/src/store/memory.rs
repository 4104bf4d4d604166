use rand::Rng;

use super::Backend;
use crate::error::{Error, Result};
use crate::model::bigram_model::{BigramModel, TableStats};

/// Volatile backend keeping the table in memory only.
#[derive(Debug, Default)]
pub struct MemoryBackend {
	table: BigramModel,
	pending: Option<Vec<(String, String)>>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn table(&self) -> &BigramModel {
		&self.table
	}
}

impl Backend for MemoryBackend {
	fn upsert_increment(&mut self, current: &str, next: &str) -> Result<()> {
		self.table.add_transition(current, next, 1);
		Ok(())
	}

	fn begin(&mut self) -> Result<()> {
		if self.pending.is_some() {
			return Err(Error::storage("begin", "a transaction is already open"));
		}
		self.pending = Some(Vec::new());
		Ok(())
	}

	fn stage_increment(&mut self, current: &str, next: &str) -> Result<()> {
		match self.pending.as_mut() {
			Some(pending) => {
				pending.push((current.to_owned(), next.to_owned()));
				Ok(())
			}
			None => Err(Error::storage("stage", "no open transaction")),
		}
	}

	fn commit(&mut self) -> Result<()> {
		let pending = self
			.pending
			.take()
			.ok_or_else(|| Error::storage("commit", "no open transaction"))?;
		for (current, next) in &pending {
			self.table.add_transition(current, next, 1);
		}
		Ok(())
	}

	fn rollback(&mut self) {
		self.pending = None;
	}

	fn scan(&self, current: &str) -> Result<Vec<(String, u64)>> {
		Ok(self.table.followers(current))
	}

	fn random_current<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Option<String>> {
		Ok(self.table.random_current(rng))
	}

	fn truncate(&mut self) -> Result<()> {
		self.table.clear();
		self.pending = None;
		Ok(())
	}

	fn stats(&self) -> Result<TableStats> {
		Ok(self.table.stats())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn staged_increments_are_invisible_until_commit() {
		let mut backend = MemoryBackend::new();
		backend.begin().unwrap();
		backend.stage_increment("the", "cat").unwrap();
		assert!(backend.scan("the").unwrap().is_empty());

		backend.commit().unwrap();
		assert_eq!(backend.scan("the").unwrap(), vec![("cat".to_owned(), 1)]);
	}

	#[test]
	fn rollback_discards_staged_increments() {
		let mut backend = MemoryBackend::new();
		backend.begin().unwrap();
		backend.stage_increment("the", "cat").unwrap();
		backend.rollback();

		assert!(backend.table().is_empty());
		assert!(backend.commit().is_err());
	}

	#[test]
	fn nested_begin_is_refused() {
		let mut backend = MemoryBackend::new();
		backend.begin().unwrap();
		assert!(backend.begin().is_err());
	}

	#[test]
	fn staging_needs_a_transaction() {
		let mut backend = MemoryBackend::new();
		assert!(backend.stage_increment("the", "cat").is_err());
	}
}
