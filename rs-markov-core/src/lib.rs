//! Word-level Markov text generation library.
//!
//! This crate provides a first-order Markov chain over words including:
//! - A durable `(current, next) -> count` transition store with atomic batches
//! - Training from text, token streams, `.txt` files and `.zip` archives
//! - Weighted random walks with an injectable random source
//! - Configuration and source enumeration helpers
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use rs_markov_core::{Generator, StartWord, Trainer, TransitionStore};
//!
//! # fn main() -> rs_markov_core::Result<()> {
//! let mut store = TransitionStore::open("markov.db")?;
//! Trainer::new(&mut store).train_path("books/")?;
//! let text = Generator::new(&store, StdRng::seed_from_u64(42)).generate_text(50, &StartWord::Random)?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

/// Error taxonomy shared by every component.
pub mod error;

/// Run configuration (TOML, all fields defaulted).
pub mod config;

/// Text normalization into word tokens.
pub mod tokenizer;

/// Corpus source classification and archive access.
pub mod source;

/// Transition store and its backends.
pub mod store;

/// Transition table, training and generation.
pub mod model;

/// I/O utilities (file loading, path helpers, directory walking).
pub mod io;

pub use config::Config;
pub use error::{Error, Result};
pub use model::bigram_model::TableStats;
pub use model::generator::{Generator, StartWord};
pub use model::trainer::{TrainReport, Trainer, DEFAULT_BATCH_SIZE};
pub use store::{Backend, FileBackend, MemoryBackend, TransitionStore};
