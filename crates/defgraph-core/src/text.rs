//! Token rules shared by definition sources and the graph builder
//!
//! Only lowercase ASCII letters form words. Headwords must consist of
//! letters only; definition text is split on everything else.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+$").unwrap());
static WORD_SPLIT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z]").unwrap());

/// Whether `s` is a single word (already lowercased)
pub fn is_word(s: &str) -> bool {
    WORD_PATTERN.is_match(s)
}

/// Lowercase `s` and split it into its distinct words
pub fn to_words(s: &str) -> HashSet<String> {
    let lowered = s.to_lowercase();
    WORD_SPLIT_PATTERN
        .split(&lowered)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
