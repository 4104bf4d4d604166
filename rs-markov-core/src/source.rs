use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::io::has_extension;

const TEXT_EXTENSION: &str = "txt";
const ARCHIVE_EXTENSION: &str = "zip";

/// What a corpus file is treated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
	/// Plain `.txt` file.
	Text,
	/// `.zip` archive whose `.txt` entries are text sources.
	Archive,
}

/// Classifies a file by extension (case-insensitive), `None` when ignored.
pub fn classify<P: AsRef<Path>>(path: P) -> Option<SourceKind> {
	let path = path.as_ref();
	if has_extension(path, ARCHIVE_EXTENSION) {
		Some(SourceKind::Archive)
	} else if has_extension(path, TEXT_EXTENSION) {
		Some(SourceKind::Text)
	} else {
		None
	}
}

/// Opens a plain text source for line streaming.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
	let path = path.as_ref();
	let file = File::open(path).map_err(|e| Error::source_read(path, e))?;
	Ok(BufReader::new(file))
}

/// A zip archive opened for reading its text entries.
pub struct Archive {
	path: PathBuf,
	inner: ZipArchive<BufReader<File>>,
}

impl Archive {
	/// # Errors
	/// - `SourceRead` if the file cannot be opened or is not a zip archive
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let file = File::open(path).map_err(|e| Error::source_read(path, e))?;
		let inner = ZipArchive::new(BufReader::new(file)).map_err(|e| Error::source_read(path, e))?;
		Ok(Self { path: path.to_path_buf(), inner })
	}

	/// Total number of entries, text or not.
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Indices and names of the entries ending in `.txt`, in archive order.
	pub fn text_entries(&self) -> Vec<(usize, String)> {
		(0..self.inner.len())
			.filter_map(|index| {
				let name = self.inner.name_for_index(index)?;
				classify(name)
					.filter(|kind| *kind == SourceKind::Text)
					.map(|_| (index, name.to_owned()))
			})
			.collect()
	}

	/// Label used in logs and errors: `archive.zip!entry.txt`.
	pub fn entry_label(&self, name: &str) -> String {
		format!("{}!{}", self.path.display(), name)
	}

	/// Opens one entry for streaming.
	///
	/// # Errors
	/// - `SourceRead` if the entry header is corrupt or uses an
	///   unsupported compression method
	pub fn open_entry(&mut self, index: usize) -> Result<BufReader<impl Read + '_>> {
		let label = match self.inner.name_for_index(index) {
			Some(name) => self.entry_label(name),
			None => format!("{}#{}", self.path.display(), index),
		};
		let entry = self.inner.by_index(index).map_err(|e| Error::source_read(label, e))?;
		Ok(BufReader::new(entry))
	}
}

/// Reads the next line of `reader`, decoding invalid UTF-8 lossily.
///
/// Returns `Ok(None)` at end of input.
pub(crate) fn read_line_lossy<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> std::io::Result<Option<String>> {
	buffer.clear();
	if reader.read_until(b'\n', buffer)? == 0 {
		return Ok(None);
	}
	Ok(Some(String::from_utf8_lossy(buffer).into_owned()))
}
