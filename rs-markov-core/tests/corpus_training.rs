use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rs_markov_core::{Error, FileBackend, Generator, StartWord, Trainer, TransitionStore};
use tempfile::tempdir;
use zip::write::SimpleFileOptions;

const SAMPLE: &str = "The cat sat on the mat.\nThe cat ran!";

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
	let mut writer = zip::ZipWriter::new(File::create(path).expect("create zip"));
	for (name, content) in entries {
		writer.start_file(*name, SimpleFileOptions::default()).expect("start entry");
		writer.write_all(content.as_bytes()).expect("write entry");
	}
	writer.finish().expect("finish zip");
}

fn followers(store: &TransitionStore<FileBackend>, word: &str) -> HashMap<String, u64> {
	store.followers(word).expect("followers").into_iter().collect()
}

#[test]
fn trains_text_files_and_archive_entries() {
	let dir = tempdir().expect("tempdir");
	let corpus = dir.path().join("corpus");
	fs::create_dir_all(corpus.join("nested")).expect("corpus dir");
	fs::write(corpus.join("a.txt"), SAMPLE).expect("write text");
	fs::write(corpus.join("notes.md"), "ignored words here").expect("write md");
	write_zip(
		&corpus.join("nested").join("books.zip"),
		&[("book.TXT", SAMPLE), ("cover.png", "binary blob"), ("dir/other.txt", "the end")],
	);

	let mut store = TransitionStore::open(dir.path().join("markov.db")).expect("open store");
	let report = Trainer::with_batch_size(&mut store, 3)
		.expect("trainer")
		.train_path(&corpus)
		.expect("train");

	assert!(report.failures.is_empty(), "{:?}", report.failures);
	assert_eq!(report.sources, 3);
	assert_eq!(report.pairs, 8 + 8 + 1);

	assert_eq!(followers(&store, "the"), HashMap::from([("cat".to_owned(), 4), ("mat".to_owned(), 2), ("end".to_owned(), 1)]));
	assert_eq!(followers(&store, "cat"), HashMap::from([("sat".to_owned(), 2), ("ran".to_owned(), 2)]));
	assert!(followers(&store, "ignored").is_empty());
	assert!(followers(&store, "binary").is_empty());
}

#[test]
fn broken_sources_are_skipped_and_reported() {
	let dir = tempdir().expect("tempdir");
	let corpus = dir.path().join("corpus");
	fs::create_dir_all(&corpus).expect("corpus dir");
	fs::write(corpus.join("a_broken.zip"), "this is not a zip archive").expect("write fake zip");
	fs::write(corpus.join("b_good.txt"), "red fish blue fish").expect("write text");

	let mut store = TransitionStore::open(dir.path().join("markov.db")).expect("open store");
	let report = Trainer::new(&mut store).train_path(&corpus).expect("train");

	assert_eq!(report.sources, 1);
	assert_eq!(report.pairs, 3);
	assert_eq!(report.failures.len(), 1);
	assert!(matches!(&report.failures[0], Error::SourceRead { path, .. } if path.ends_with("a_broken.zip")));
	assert_eq!(followers(&store, "fish"), HashMap::from([("blue".to_owned(), 1)]));
}

#[test]
fn counts_persist_and_double_on_retraining() {
	let dir = tempdir().expect("tempdir");
	let corpus = dir.path().join("story.txt");
	fs::write(&corpus, SAMPLE).expect("write text");
	let db = dir.path().join("markov.db");

	{
		let mut store = TransitionStore::open(&db).expect("open store");
		Trainer::new(&mut store).train_path(&corpus).expect("first pass");
	}
	{
		let mut store = TransitionStore::open(&db).expect("reopen store");
		assert_eq!(followers(&store, "the"), HashMap::from([("cat".to_owned(), 2), ("mat".to_owned(), 1)]));
		Trainer::new(&mut store).train_path(&corpus).expect("second pass");
	}

	let store = TransitionStore::open(&db).expect("reopen store");
	assert_eq!(followers(&store, "the"), HashMap::from([("cat".to_owned(), 4), ("mat".to_owned(), 2)]));
	assert_eq!(store.stats().expect("stats").observations, 16);
}

#[test]
fn clear_then_generate_reports_empty_model() {
	let dir = tempdir().expect("tempdir");
	let db = dir.path().join("markov.db");
	let mut store = TransitionStore::open(&db).expect("open store");
	Trainer::new(&mut store).train_text(SAMPLE).expect("train");
	store.clear().expect("clear");

	let mut generator = Generator::new(&store, StdRng::seed_from_u64(1));
	assert!(matches!(generator.generate(5), Err(Error::EmptyModel)));
	drop(generator);

	let reopened = TransitionStore::open(&db).expect("reopen store");
	assert!(matches!(reopened.random_key(&mut StdRng::seed_from_u64(1)), Err(Error::EmptyStore)));
}

#[test]
fn seeded_generation_is_reproducible_across_reopen() {
	let dir = tempdir().expect("tempdir");
	let db = dir.path().join("markov.db");
	{
		let mut store = TransitionStore::open(&db).expect("open store");
		Trainer::new(&mut store)
			.train_tokens(["a", "b", "a", "c", "b", "c", "a", "a", "b"].map(String::from))
			.expect("train");
	}

	let store = TransitionStore::open(&db).expect("reopen store");
	let first = Generator::new(&store, StdRng::seed_from_u64(77))
		.generate_text(40, &StartWord::Random)
		.expect("generate");
	let second = Generator::new(&store, StdRng::seed_from_u64(77))
		.generate_text(40, &StartWord::Random)
		.expect("generate");

	assert_eq!(first, second);
	assert_eq!(first.split(' ').count(), 40);
}
