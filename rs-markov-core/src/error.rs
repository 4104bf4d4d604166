use std::error::Error as StdError;
use std::path::Path;

/// Errors surfaced by the transition store, the trainer and the generator.
///
/// `SourceRead` is the only variant the trainer swallows (per source);
/// everything else propagates to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The backing store could not be read, written or decoded.
	#[error("storage unavailable: {context}")]
	StorageUnavailable {
		context: String,
		#[source]
		source: Box<dyn StdError + Send + Sync>,
	},

	/// `random_key` was called on a store holding no transitions.
	#[error("transition store is empty")]
	EmptyStore,

	/// Generation was requested but there is nothing to start from.
	#[error("no training data in the model")]
	EmptyModel,

	/// One corpus file or archive entry could not be read.
	#[error("failed to read source {path}: {reason}")]
	SourceRead { path: String, reason: String },

	/// A word handed to the store was empty.
	#[error("transition words must not be empty")]
	InvalidToken,

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub(crate) fn storage<E>(context: impl Into<String>, source: E) -> Self
	where
		E: Into<Box<dyn StdError + Send + Sync>>,
	{
		Error::StorageUnavailable { context: context.into(), source: source.into() }
	}

	pub(crate) fn source_read<P: AsRef<Path>>(path: P, reason: impl ToString) -> Self {
		Error::SourceRead {
			path: path.as_ref().display().to_string(),
			reason: reason.to_string(),
		}
	}

	/// Returns `true` for failures that only concern a single corpus source.
	pub fn is_source_failure(&self) -> bool {
		matches!(self, Error::SourceRead { .. })
	}
}
