use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Builds a path next to `input_path` by appending `suffix` to its file name.
///
/// Example:
/// `data/markov.db` + `"-journal"` → `data/markov.db-journal`
pub(crate) fn build_sibling_path<P: AsRef<Path>>(input_path: P, suffix: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();
	let file_name = input_path
		.file_name()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

	let mut name = OsString::from(file_name);
	name.push(suffix);
	Ok(input_path.with_file_name(name))
}

/// Returns the directory holding `path`, `"."` for bare file names.
pub(crate) fn parent_dir(path: &Path) -> &Path {
	match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	}
}

/// Case-insensitive extension check (`"txt"` matches `A.TXT`).
pub(crate) fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
	path.as_ref()
		.extension()
		.map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
		.unwrap_or(false)
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Files found below a root, plus the directories that could not be listed.
#[derive(Debug, Default)]
pub(crate) struct Walk {
	pub files: Vec<PathBuf>,
	pub errors: Vec<(PathBuf, io::Error)>,
}

/// Lists every file below `root`, recursively, in sorted order.
///
/// A file `root` yields itself. Unreadable directories are collected in
/// `errors` and do not stop the walk.
pub(crate) fn walk_files<P: AsRef<Path>>(root: P) -> Walk {
	let mut walk = Walk::default();
	let root = root.as_ref();
	if root.is_file() {
		walk.files.push(root.to_path_buf());
	} else {
		visit(root, &mut walk);
	}
	walk
}

fn visit(dir: &Path, walk: &mut Walk) {
	let entries = match fs::read_dir(dir).and_then(|entries| entries.collect::<io::Result<Vec<_>>>()) {
		Ok(entries) => entries,
		Err(e) => {
			walk.errors.push((dir.to_path_buf(), e));
			return;
		}
	};

	let mut paths: Vec<PathBuf> = entries.into_iter().map(|entry| entry.path()).collect();
	paths.sort();

	for path in paths {
		if path.is_dir() {
			visit(&path, walk);
		} else if path.is_file() {
			walk.files.push(path);
		}
	}
}
