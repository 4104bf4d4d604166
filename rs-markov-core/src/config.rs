use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::trainer::DEFAULT_BATCH_SIZE;

/// Settings of a train-then-generate run.
///
/// Every field has a default, so a TOML file only lists what it changes:
///
/// ```toml
/// database = "data/markov.db"
/// corpus = "books/"
/// batch_size = 1000
/// length = 60
/// seed = 42
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	#[serde(default = "default_database")]
	pub database: PathBuf,
	/// Directory, `.txt` or `.zip` to train on before generating.
	#[serde(default)]
	pub corpus: Option<PathBuf>,
	#[serde(default = "default_batch_size")]
	pub batch_size: usize,
	/// Maximum number of generated words.
	#[serde(default = "default_length")]
	pub length: usize,
	/// Seed of the random walk, entropy when absent.
	#[serde(default)]
	pub seed: Option<u64>,
	/// First word of the walk, random when absent.
	#[serde(default)]
	pub start: Option<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			database: default_database(),
			corpus: None,
			batch_size: default_batch_size(),
			length: default_length(),
			seed: None,
			start: None,
		}
	}
}

impl Config {
	/// Reads and validates a TOML configuration file.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path)
			.map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
		let config: Self = toml::from_str(&text)
			.map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.batch_size == 0 {
			return Err(Error::InvalidConfig("batch_size must be at least 1".to_owned()));
		}
		if self.database.as_os_str().is_empty() {
			return Err(Error::InvalidConfig("database path must not be empty".to_owned()));
		}
		Ok(())
	}
}

fn default_database() -> PathBuf {
	PathBuf::from("markov.db")
}

fn default_batch_size() -> usize {
	DEFAULT_BATCH_SIZE
}

fn default_length() -> usize {
	100
}
