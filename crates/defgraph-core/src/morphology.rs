//! Morphological resolution of definition tokens
//!
//! Definitions reference inflected forms (`cars`, `played`) while the graph
//! only holds headwords. Each token is mapped to a headword by the first
//! matching rule of [`INFLECTION_RULES`]; tokens no rule matches are dropped.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// Word classes
// ============================================================================

/// Grammatical tag -> headwords carrying it
#[derive(Debug, Clone, Default)]
pub struct WordClassIndex {
    classes: HashMap<String, HashSet<String>>,
}

impl WordClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `word` is tagged with `word_class`
    pub fn insert(&mut self, word_class: &str, word: &str) {
        self.classes
            .entry(word_class.to_string())
            .or_default()
            .insert(word.to_string());
    }

    /// Headwords tagged exactly `word_class`
    pub fn words(&self, word_class: &str) -> Option<&HashSet<String>> {
        self.classes.get(word_class)
    }

    /// Union of the headwords of every tag starting with `prefix`
    pub fn words_with_prefix(&self, prefix: &str) -> HashSet<String> {
        self.classes
            .iter()
            .filter(|(tag, _)| tag.starts_with(prefix))
            .flat_map(|(_, words)| words.iter().cloned())
            .collect()
    }

    /// Number of distinct tags
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Set a rule checks its candidate against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordClass {
    Headword,
    Noun,
    Verb,
}

/// Reference sets consulted during resolution
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub headwords: HashSet<String>,
    pub nouns: HashSet<String>,
    pub verbs: HashSet<String>,
}

impl Lexicon {
    /// Build the lexicon from the final word-class index
    ///
    /// Nouns are the words tagged exactly `noun_tag`; verbs are the words of
    /// every tag starting with `verb_tag_prefix`.
    pub fn from_index(
        headwords: HashSet<String>,
        index: &WordClassIndex,
        noun_tag: &str,
        verb_tag_prefix: &str,
    ) -> Self {
        Self {
            headwords,
            nouns: index.words(noun_tag).cloned().unwrap_or_default(),
            verbs: index.words_with_prefix(verb_tag_prefix),
        }
    }

    fn contains(&self, class: WordClass, word: &str) -> bool {
        match class {
            WordClass::Headword => self.headwords.contains(word),
            WordClass::Noun => self.nouns.contains(word),
            WordClass::Verb => self.verbs.contains(word),
        }
    }

    /// Resolve a token to a headword; `None` drops the token
    pub fn resolve(&self, token: &str) -> Option<String> {
        INFLECTION_RULES
            .iter()
            .find_map(|rule| rule.apply(token, self))
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Replace `suffix` by `replacement` and look the result up in `class`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflectionRule {
    pub suffix: &'static str,
    pub replacement: &'static str,
    pub class: WordClass,
}

impl InflectionRule {
    const fn new(suffix: &'static str, replacement: &'static str, class: WordClass) -> Self {
        Self {
            suffix,
            replacement,
            class,
        }
    }

    /// Candidate headword for `token`, if the rule applies
    pub fn apply(&self, token: &str, lexicon: &Lexicon) -> Option<String> {
        let stem = token.strip_suffix(self.suffix)?;
        let candidate = format!("{stem}{}", self.replacement);
        lexicon.contains(self.class, &candidate).then_some(candidate)
    }
}

/// Resolution rules in priority order; the first match wins
pub const INFLECTION_RULES: &[InflectionRule] = &[
    InflectionRule::new("", "", WordClass::Headword),
    // Plural nouns
    InflectionRule::new("s", "", WordClass::Noun), // car -> cars
    InflectionRule::new("es", "", WordClass::Noun), // bus -> buses
    InflectionRule::new("ves", "f", WordClass::Noun), // wolf -> wolves
    InflectionRule::new("ies", "y", WordClass::Noun), // city -> cities
    // Verbs
    InflectionRule::new("d", "", WordClass::Verb), // live -> lived
    InflectionRule::new("ed", "", WordClass::Verb), // play -> played
    InflectionRule::new("ied", "y", WordClass::Verb), // try -> tried
    InflectionRule::new("ing", "", WordClass::Verb), // play -> playing
];

// ============================================================================
// Adjacency map
// ============================================================================

/// Headword -> words referenced by its definitions
#[derive(Debug, Clone, Default)]
pub struct AdjacencyMap {
    entries: HashMap<String, HashSet<String>>,
}

impl AdjacencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `references` into the set of `word`, creating it if absent
    pub fn add_adjacencies(&mut self, word: &str, references: HashSet<String>) {
        self.entries
            .entry(word.to_string())
            .or_default()
            .extend(references);
    }

    /// The set of defined words (the map keys)
    pub fn headwords(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Defined words in a stable order
    pub fn sorted_headwords(&self) -> Vec<String> {
        let mut words: Vec<String> = self.entries.keys().cloned().collect();
        words.sort();
        words
    }

    pub fn get(&self, word: &str) -> Option<&HashSet<String>> {
        self.entries.get(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashSet<String>)> {
        self.entries.iter()
    }

    /// Number of headwords
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (word, reference) pairs
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(HashSet::len).sum()
    }

    /// Replace every reference set by its resolved form
    ///
    /// Must run once the map and the lexicon are complete.
    pub fn resolve(&mut self, lexicon: &Lexicon) {
        for references in self.entries.values_mut() {
            *references = references
                .iter()
                .filter_map(|token| lexicon.resolve(token))
                .collect();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
