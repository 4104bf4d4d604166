use std::io::BufRead;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::io::walk_files;
use crate::source::{self, Archive, SourceKind};
use crate::store::{Backend, TransitionStore};
use crate::tokenizer::tokenize;

/// Number of pairs flushed per `increment_batch` call by default.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Words between two progress log lines while streaming a source.
const PROGRESS_EVERY: u64 = 1000;

/// Outcome of a `train_path` run.
///
/// `failures` only ever holds `Error::SourceRead` values: every source in
/// it was skipped while the others were still trained.
#[derive(Debug, Default)]
pub struct TrainReport {
	/// Sources (files or archive entries) trained successfully.
	pub sources: usize,
	/// Adjacent pairs sent to the store.
	pub pairs: u64,
	pub failures: Vec<Error>,
}

impl TrainReport {
	fn skip(&mut self, err: Error) -> Result<()> {
		if !err.is_source_failure() {
			return Err(err);
		}
		warn!("Skipping {}", err);
		self.failures.push(err);
		Ok(())
	}
}

/// Accumulates adjacent pairs and flushes them in fixed-size batches.
struct PairBatcher<'s, B: Backend> {
	store: &'s mut TransitionStore<B>,
	batch: Vec<(String, String)>,
	batch_size: usize,
	previous: Option<String>,
	words: u64,
	pairs: u64,
}

impl<'s, B: Backend> PairBatcher<'s, B> {
	fn new(store: &'s mut TransitionStore<B>, batch_size: usize) -> Self {
		Self {
			store,
			batch: Vec::with_capacity(batch_size),
			batch_size,
			previous: None,
			words: 0,
			pairs: 0,
		}
	}

	fn push(&mut self, word: String) -> Result<()> {
		self.words += 1;
		if let Some(previous) = self.previous.take() {
			self.batch.push((previous, word.clone()));
			self.pairs += 1;
			if self.batch.len() >= self.batch_size {
				self.flush()?;
			}
		}
		self.previous = Some(word);
		Ok(())
	}

	fn flush(&mut self) -> Result<()> {
		if self.batch.is_empty() {
			return Ok(());
		}
		self.store.increment_batch(&self.batch)?;
		debug!("Flushed {} pairs", self.batch.len());
		self.batch.clear();
		Ok(())
	}

	/// Flushes the remainder and returns `(words, pairs)`.
	fn finish(mut self) -> Result<(u64, u64)> {
		self.flush()?;
		Ok((self.words, self.pairs))
	}
}

/// Turns token streams into transition observations.
///
/// # Responsibilities
/// - Emit every adjacent `(tokens[i], tokens[i + 1])` pair exactly once
/// - Batch pairs to bound the number of store round-trips
/// - Isolate per-source read failures during directory training
pub struct Trainer<'a, B: Backend> {
	store: &'a mut TransitionStore<B>,
	batch_size: usize,
}

impl<'a, B: Backend> Trainer<'a, B> {
	pub fn new(store: &'a mut TransitionStore<B>) -> Self {
		Self { store, batch_size: DEFAULT_BATCH_SIZE }
	}

	/// # Errors
	/// Returns `InvalidConfig` if `batch_size` is 0.
	pub fn with_batch_size(store: &'a mut TransitionStore<B>, batch_size: usize) -> Result<Self> {
		if batch_size == 0 {
			return Err(Error::InvalidConfig("batch_size must be at least 1".to_owned()));
		}
		Ok(Self { store, batch_size })
	}

	pub fn batch_size(&self) -> usize {
		self.batch_size
	}

	/// Trains on an already tokenized sequence, batching the pairs.
	///
	/// Fewer than two tokens is a no-op. Returns the number of pairs.
	pub fn train_tokens<I>(&mut self, tokens: I) -> Result<u64>
	where
		I: IntoIterator<Item = String>,
	{
		let mut batcher = PairBatcher::new(&mut *self.store, self.batch_size);
		for token in tokens {
			batcher.push(token)?;
		}
		let (_, pairs) = batcher.finish()?;
		Ok(pairs)
	}

	/// Tokenizes `text` and applies one `increment` per pair.
	///
	/// Meant for small inputs; counts are identical to `train_tokens`
	/// on the same tokens. The store is checkpointed afterwards.
	pub fn train_text(&mut self, text: &str) -> Result<u64> {
		let words = tokenize(text);
		if words.len() < 2 {
			return Ok(0);
		}

		for pair in words.windows(2) {
			self.store.increment(&pair[0], &pair[1])?;
		}
		self.store.checkpoint()?;
		Ok(words.len() as u64 - 1)
	}

	/// Streams `reader` line by line, batching the pairs.
	///
	/// The last word of a line is paired with the first word of the next
	/// one, so the result equals tokenizing the whole content at once.
	/// `name` labels the source in logs and errors.
	///
	/// # Errors
	/// - `SourceRead` if reading fails; batches flushed before the failure stay applied
	/// - `StorageUnavailable` if the store rejects a batch
	pub fn train_reader<R: BufRead>(&mut self, mut reader: R, name: &str) -> Result<u64> {
		let mut batcher = PairBatcher::new(&mut *self.store, self.batch_size);
		let mut buffer = Vec::new();
		let mut next_progress = PROGRESS_EVERY;

		while let Some(line) = source::read_line_lossy(&mut reader, &mut buffer).map_err(|e| Error::source_read(name, e))? {
			for word in tokenize(&line) {
				batcher.push(word)?;
			}
			if batcher.words >= next_progress {
				debug!("    {} words processed...", batcher.words);
				next_progress = (batcher.words / PROGRESS_EVERY + 1) * PROGRESS_EVERY;
			}
		}

		let (words, pairs) = batcher.finish()?;
		info!(" -> Finished {}, {} words processed", name, words);
		Ok(pairs)
	}

	/// Trains on every text source below `root` (or on `root` itself).
	///
	/// # Behavior
	/// - Files are visited recursively in sorted order.
	/// - `.txt` files are streamed with `train_reader`.
	/// - `.zip` archives have each `.txt` entry streamed with `train_reader`.
	/// - Other files are ignored.
	/// - A failing file, archive or entry is logged, recorded in
	///   `TrainReport::failures` and skipped.
	/// - The store is checkpointed once every source was processed.
	///
	/// # Errors
	/// Only store failures abort the run.
	pub fn train_path<P: AsRef<Path>>(&mut self, root: P) -> Result<TrainReport> {
		let mut report = TrainReport::default();
		let walk = walk_files(root);

		for (dir, e) in walk.errors {
			report.skip(Error::source_read(dir, e))?;
		}

		for file in walk.files {
			info!("Found file: {}", file.display());
			let outcome = match source::classify(&file) {
				Some(SourceKind::Text) => self.train_text_file(&file, &mut report),
				Some(SourceKind::Archive) => self.train_archive(&file, &mut report),
				None => {
					debug!("Ignoring {}", file.display());
					continue;
				}
			};
			if let Err(e) = outcome {
				report.skip(e)?;
			}
		}

		self.store.checkpoint()?;
		Ok(report)
	}

	fn train_text_file(&mut self, path: &Path, report: &mut TrainReport) -> Result<()> {
		let reader = source::open_text(path)?;
		report.pairs += self.train_reader(reader, &path.display().to_string())?;
		report.sources += 1;
		Ok(())
	}

	fn train_archive(&mut self, path: &Path, report: &mut TrainReport) -> Result<()> {
		let mut archive = Archive::open(path)?;
		info!("Processing ZIP: {} ({} entries)", path.display(), archive.len());

		for (index, name) in archive.text_entries() {
			let label = archive.entry_label(&name);
			let trained = archive
				.open_entry(index)
				.and_then(|reader| self.train_reader(reader, &label));
			match trained {
				Ok(pairs) => {
					report.pairs += pairs;
					report.sources += 1;
				}
				Err(e) => report.skip(e)?,
			}
		}
		Ok(())
	}
}
