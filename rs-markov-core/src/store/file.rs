use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::Backend;
use crate::error::{Error, Result};
use crate::io::{build_sibling_path, parent_dir};
use crate::model::bigram_model::{BigramModel, TableStats};

const FORMAT_VERSION: u32 = 2;
const JOURNAL_SUFFIX: &str = "-journal";
/// Journal frame header: payload length, CRC-32 of that length and CRC-32
/// of the payload, all little-endian `u32`.
const FRAME_HEADER: usize = 12;

#[derive(Serialize)]
struct SnapshotRef<'a> {
	version: u32,
	generation: u64,
	model: &'a BigramModel,
}

#[derive(Deserialize)]
struct Snapshot {
	version: u32,
	generation: u64,
	model: BigramModel,
}

#[derive(Serialize)]
struct JournalRecordRef<'a> {
	generation: u64,
	pairs: &'a [(String, String)],
}

#[derive(Deserialize)]
struct JournalRecord {
	generation: u64,
	pairs: Vec<(String, String)>,
}

/// Durable backend: a snapshot file plus an append-only journal.
///
/// # Layout
/// - `<path>`: postcard-encoded `BigramModel`, tagged with a generation
/// - `<path>-journal`: one checksummed, length-prefixed record per
///   committed batch
///
/// # Behavior
/// - A commit appends its whole batch as one record and syncs it before
///   the in-memory table is touched.
/// - Opening replays every journal record of the snapshot's generation.
///   An incomplete trailing record (torn write) is dropped, so a batch is
///   either entirely visible or not at all. A complete record that fails
///   its checksum or does not decode makes the store unavailable and the
///   journal is left as is.
/// - `checkpoint` and `truncate` atomically replace the snapshot with a
///   new generation; older journal records are ignored from then on.
#[derive(Debug)]
pub struct FileBackend {
	snapshot_path: PathBuf,
	journal_path: PathBuf,
	journal: File,
	/// Length of the valid journal prefix.
	journal_len: u64,
	generation: u64,
	table: BigramModel,
	pending: Option<Vec<(String, String)>>,
}

impl FileBackend {
	/// Opens the store at `path`, creating it (and its directory) if needed.
	///
	/// # Errors
	/// - `StorageUnavailable` if the snapshot or journal cannot be read,
	///   decoded or created
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let snapshot_path = path.as_ref().to_path_buf();
		let journal_path = build_sibling_path(&snapshot_path, JOURNAL_SUFFIX)
			.map_err(|e| Error::storage(format!("invalid store path {}", snapshot_path.display()), e))?;

		fs::create_dir_all(parent_dir(&snapshot_path))
			.map_err(|e| Error::storage("creating store directory", e))?;

		let (generation, table) = if snapshot_path.exists() {
			read_snapshot(&snapshot_path)?
		} else {
			let table = BigramModel::new();
			write_snapshot(&snapshot_path, 0, &table)?;
			(0, table)
		};

		let journal = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.open(&journal_path)
			.map_err(|e| Error::storage(format!("opening {}", journal_path.display()), e))?;

		let mut backend = Self {
			snapshot_path,
			journal_path,
			journal,
			journal_len: 0,
			generation,
			table,
			pending: None,
		};
		backend.replay()?;
		Ok(backend)
	}

	pub fn journal_path(&self) -> &Path {
		&self.journal_path
	}

	pub fn table(&self) -> &BigramModel {
		&self.table
	}

	/// Applies the journal on top of the snapshot and drops a torn tail.
	///
	/// # Errors
	/// - `StorageUnavailable` if a complete record is corrupt
	fn replay(&mut self) -> Result<()> {
		let mut bytes = Vec::new();
		self.journal
			.seek(SeekFrom::Start(0))
			.and_then(|_| self.journal.read_to_end(&mut bytes))
			.map_err(|e| Error::storage(format!("reading {}", self.journal_path.display()), e))?;

		let mut offset = 0;
		let mut replayed = 0;
		while offset < bytes.len() {
			let frame = decode_frame(&bytes[offset..]).map_err(|reason| {
				Error::storage(
					format!("corrupt record at byte {} of {}", offset, self.journal_path.display()),
					reason,
				)
			})?;
			let Some((record, frame_len)) = frame else {
				break;
			};
			if record.generation == self.generation {
				for (current, next) in &record.pairs {
					self.table.add_transition(current, next, 1);
				}
				replayed += 1;
			}
			offset += frame_len;
		}

		if offset < bytes.len() {
			warn!(
				"Discarding {} bytes of incomplete journal tail in {}",
				bytes.len() - offset,
				self.journal_path.display()
			);
			self.journal
				.set_len(offset as u64)
				.and_then(|_| self.journal.sync_data())
				.map_err(|e| Error::storage("truncating journal tail", e))?;
		}

		self.journal_len = offset as u64;
		debug!("Replayed {} journal records from {}", replayed, self.journal_path.display());
		Ok(())
	}

	/// Appends one batch to the journal and syncs it.
	///
	/// On failure the journal is cut back to its previous length.
	fn append(&mut self, pairs: &[(String, String)]) -> Result<()> {
		let payload = postcard::to_stdvec(&JournalRecordRef { generation: self.generation, pairs })
			.map_err(|e| Error::storage("encoding journal record", e))?;
		let len = u32::try_from(payload.len())
			.map_err(|_| Error::storage("encoding journal record", "batch too large for one record"))?;

		let len = len.to_le_bytes();
		let mut frame = Vec::with_capacity(FRAME_HEADER + payload.len());
		frame.extend_from_slice(&len);
		frame.extend_from_slice(&crc32fast::hash(&len).to_le_bytes());
		frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
		frame.extend_from_slice(&payload);

		let written = self
			.journal
			.seek(SeekFrom::Start(self.journal_len))
			.and_then(|_| self.journal.write_all(&frame))
			.and_then(|_| self.journal.sync_data());

		match written {
			Ok(()) => {
				self.journal_len += frame.len() as u64;
				Ok(())
			}
			Err(e) => {
				if let Err(cut) = self.journal.set_len(self.journal_len) {
					warn!("Could not cut back {}: {}", self.journal_path.display(), cut);
				}
				Err(Error::storage(format!("appending to {}", self.journal_path.display()), e))
			}
		}
	}

	/// Starts a new generation from `table` and empties the journal.
	fn rotate(&mut self, table: &BigramModel) -> Result<()> {
		let generation = self.generation + 1;
		write_snapshot(&self.snapshot_path, generation, table)?;
		self.generation = generation;

		// The snapshot is authoritative from here, stale records are skipped on replay
		match self.journal.set_len(0).and_then(|_| self.journal.sync_data()) {
			Ok(()) => self.journal_len = 0,
			Err(e) => warn!("Could not empty {}: {}", self.journal_path.display(), e),
		}
		Ok(())
	}
}

impl Backend for FileBackend {
	fn upsert_increment(&mut self, current: &str, next: &str) -> Result<()> {
		self.append(&[(current.to_owned(), next.to_owned())])?;
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
		if pending.is_empty() {
			return Ok(());
		}

		self.append(&pending)?;
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
		self.pending = None;
		self.rotate(&BigramModel::new())?;
		self.table.clear();
		Ok(())
	}

	fn stats(&self) -> Result<TableStats> {
		Ok(self.table.stats())
	}

	fn checkpoint(&mut self) -> Result<()> {
		if self.journal_len == 0 {
			return Ok(());
		}
		let table = std::mem::take(&mut self.table);
		let rotated = self.rotate(&table);
		self.table = table;
		rotated
	}
}

/// Decodes the record at the start of `bytes`.
///
/// Returns the record and its full frame length, `None` when the frame
/// runs past the end of `bytes` (torn write), or the reason it is corrupt.
fn decode_frame(bytes: &[u8]) -> std::result::Result<Option<(JournalRecord, usize)>, String> {
	let Some(header) = bytes.get(..FRAME_HEADER) else {
		return Ok(None);
	};
	let word = |at: usize| u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]]);

	if crc32fast::hash(&header[..4]) != word(4) {
		return Err("length checksum mismatch".to_owned());
	}
	let len = word(0) as usize;
	let Some(payload) = bytes.get(FRAME_HEADER..FRAME_HEADER + len) else {
		return Ok(None);
	};
	if crc32fast::hash(payload) != word(8) {
		return Err("payload checksum mismatch".to_owned());
	}

	let record = postcard::from_bytes(payload).map_err(|e| e.to_string())?;
	Ok(Some((record, FRAME_HEADER + len)))
}

fn read_snapshot(path: &Path) -> Result<(u64, BigramModel)> {
	let bytes = fs::read(path).map_err(|e| Error::storage(format!("reading {}", path.display()), e))?;
	let snapshot: Snapshot = postcard::from_bytes(&bytes)
		.map_err(|e| Error::storage(format!("decoding {}", path.display()), e))?;
	if snapshot.version != FORMAT_VERSION {
		return Err(Error::storage(
			format!("decoding {}", path.display()),
			format!("unsupported format version {}", snapshot.version),
		));
	}
	Ok((snapshot.generation, snapshot.model))
}

/// Replaces the snapshot atomically (temporary file, sync, rename).
fn write_snapshot(path: &Path, generation: u64, model: &BigramModel) -> Result<()> {
	let bytes = postcard::to_stdvec(&SnapshotRef { version: FORMAT_VERSION, generation, model })
		.map_err(|e| Error::storage("encoding snapshot", e))?;

	let mut temp_file = NamedTempFile::new_in(parent_dir(path))
		.map_err(|e| Error::storage("creating temporary snapshot", e))?;
	temp_file
		.write_all(&bytes)
		.and_then(|_| temp_file.as_file().sync_all())
		.map_err(|e| Error::storage("writing temporary snapshot", e))?;
	temp_file
		.persist(path)
		.map_err(|e| Error::storage(format!("replacing {}", path.display()), e.error))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
		raw.iter().map(|(c, n)| (c.to_string(), n.to_string())).collect()
	}

	fn commit_batch(backend: &mut FileBackend, raw: &[(&str, &str)]) {
		backend.begin().unwrap();
		for (current, next) in pairs(raw) {
			backend.stage_increment(&current, &next).unwrap();
		}
		backend.commit().unwrap();
	}

	#[test]
	fn open_creates_snapshot_and_journal() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("markov.db");
		let backend = FileBackend::open(&path).unwrap();

		assert!(path.exists());
		assert!(backend.journal_path().exists());
		assert!(backend.table().is_empty());
	}

	#[test]
	fn committed_batches_survive_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		{
			let mut backend = FileBackend::open(&path).unwrap();
			commit_batch(&mut backend, &[("the", "cat"), ("cat", "sat"), ("the", "cat")]);
			backend.upsert_increment("the", "mat").unwrap();
		}

		let backend = FileBackend::open(&path).unwrap();
		assert_eq!(backend.table().count("the", "cat"), 2);
		assert_eq!(backend.table().count("the", "mat"), 1);
		assert_eq!(backend.table().count("cat", "sat"), 1);
	}

	#[test]
	fn rolled_back_batches_never_reach_disk() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		{
			let mut backend = FileBackend::open(&path).unwrap();
			backend.begin().unwrap();
			backend.stage_increment("the", "cat").unwrap();
			backend.rollback();
		}

		let backend = FileBackend::open(&path).unwrap();
		assert!(backend.table().is_empty());
		assert_eq!(fs::metadata(backend.journal_path()).unwrap().len(), 0);
	}

	#[test]
	fn torn_journal_tail_is_discarded() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		let journal_path;
		let intact_len;
		{
			let mut backend = FileBackend::open(&path).unwrap();
			commit_batch(&mut backend, &[("a", "b")]);
			journal_path = backend.journal_path().to_path_buf();
			intact_len = fs::metadata(&journal_path).unwrap().len();
		}

		// Simulate a crash halfway through appending a second batch
		let len = 100u32.to_le_bytes();
		let mut torn = Vec::new();
		torn.extend_from_slice(&len);
		torn.extend_from_slice(&crc32fast::hash(&len).to_le_bytes());
		torn.extend_from_slice(&0u32.to_le_bytes());
		torn.extend_from_slice(&[1, 2, 3]);
		let mut journal = OpenOptions::new().append(true).open(&journal_path).unwrap();
		journal.write_all(&torn).unwrap();
		drop(journal);

		let mut backend = FileBackend::open(&path).unwrap();
		assert_eq!(backend.table().count("a", "b"), 1);
		assert_eq!(backend.table().stats().transitions, 1);
		assert_eq!(fs::metadata(&journal_path).unwrap().len(), intact_len);

		// New commits land after the intact prefix
		commit_batch(&mut backend, &[("b", "c")]);
		drop(backend);
		let backend = FileBackend::open(&path).unwrap();
		assert_eq!(backend.table().count("b", "c"), 1);
	}

	#[test]
	fn torn_frame_header_is_discarded() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		let journal_path;
		{
			let mut backend = FileBackend::open(&path).unwrap();
			commit_batch(&mut backend, &[("a", "b")]);
			journal_path = backend.journal_path().to_path_buf();
		}
		let intact_len = fs::metadata(&journal_path).unwrap().len();
		let mut journal = OpenOptions::new().append(true).open(&journal_path).unwrap();
		journal.write_all(&[7, 0, 0]).unwrap();
		drop(journal);

		let backend = FileBackend::open(&path).unwrap();
		assert_eq!(backend.table().count("a", "b"), 1);
		assert_eq!(fs::metadata(&journal_path).unwrap().len(), intact_len);
	}

	/// Commits three single-pair batches and returns the journal bytes.
	fn three_record_journal(path: &Path) -> (PathBuf, Vec<u8>) {
		let mut backend = FileBackend::open(path).unwrap();
		commit_batch(&mut backend, &[("the", "cat")]);
		commit_batch(&mut backend, &[("cat", "sat")]);
		commit_batch(&mut backend, &[("sat", "on")]);
		let journal_path = backend.journal_path().to_path_buf();
		drop(backend);
		let bytes = fs::read(&journal_path).unwrap();
		(journal_path, bytes)
	}

	#[test]
	fn corrupt_journal_record_is_storage_unavailable() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		let (journal_path, mut bytes) = three_record_journal(&path);

		// Flip one payload byte of the second record
		let first_len = FRAME_HEADER + u32::from_le_bytes(bytes[..4].try_into().unwrap()) as usize;
		bytes[first_len + FRAME_HEADER] ^= 0xff;
		fs::write(&journal_path, &bytes).unwrap();

		assert!(matches!(FileBackend::open(&path), Err(Error::StorageUnavailable { .. })));
		assert_eq!(fs::read(&journal_path).unwrap(), bytes);
	}

	#[test]
	fn corrupt_length_prefix_is_storage_unavailable() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		let (journal_path, mut bytes) = three_record_journal(&path);

		bytes[..4].copy_from_slice(&0xffffu32.to_le_bytes());
		fs::write(&journal_path, &bytes).unwrap();

		assert!(matches!(FileBackend::open(&path), Err(Error::StorageUnavailable { .. })));
		assert_eq!(fs::metadata(&journal_path).unwrap().len(), bytes.len() as u64);
	}

	#[test]
	fn checkpoint_folds_journal_into_snapshot() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		{
			let mut backend = FileBackend::open(&path).unwrap();
			commit_batch(&mut backend, &[("the", "cat"), ("the", "cat")]);
			backend.checkpoint().unwrap();
			assert_eq!(fs::metadata(backend.journal_path()).unwrap().len(), 0);
			commit_batch(&mut backend, &[("the", "cat")]);
		}

		let backend = FileBackend::open(&path).unwrap();
		assert_eq!(backend.table().count("the", "cat"), 3);
	}

	#[test]
	fn truncate_empties_store_durably() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		let mut rng = StdRng::seed_from_u64(0);
		{
			let mut backend = FileBackend::open(&path).unwrap();
			commit_batch(&mut backend, &[("the", "cat")]);
			backend.truncate().unwrap();
			assert!(backend.random_current(&mut rng).unwrap().is_none());

			// Still usable without reopening
			backend.upsert_increment("a", "b").unwrap();
		}

		let backend = FileBackend::open(&path).unwrap();
		assert_eq!(backend.table().count("the", "cat"), 0);
		assert_eq!(backend.table().count("a", "b"), 1);
	}

	#[test]
	fn corrupt_snapshot_is_storage_unavailable() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("markov.db");
		fs::write(&path, [0xff, 0xff, 0xff]).unwrap();

		assert!(matches!(FileBackend::open(&path), Err(Error::StorageUnavailable { .. })));
	}
}
