use std::sync::LazyLock;

use regex::Regex;

/// Tokens of this many characters or more are dropped.
pub const MAX_TOKEN_LEN: usize = 22;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
	// Should not panic
	Regex::new(r"\W+").unwrap()
});

/// Splits raw text into normalized word tokens.
///
/// - Lowercases the whole input first
/// - Splits on runs of non-word characters (Unicode aware)
/// - Drops empty tokens and tokens of `MAX_TOKEN_LEN` characters or more
///
/// Retraining on the same corpus must reproduce identical counts, so this
/// normalization is the single place words are produced.
pub fn tokenize(text: &str) -> Vec<String> {
	let lowered = text.to_lowercase();
	NON_WORD
		.split(&lowered)
		.filter(|word| is_valid_token(word))
		.map(str::to_owned)
		.collect()
}

/// Checks the length bound shared by the tokenizer and the store.
pub fn is_valid_token(word: &str) -> bool {
	let len = word.chars().count();
	len >= 1 && len < MAX_TOKEN_LEN
}
