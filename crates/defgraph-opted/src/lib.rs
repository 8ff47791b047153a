//! defgraph OPTED - Definition source for the Online Plain Text English Dictionary
//!
//! OPTED ships Webster's 1913 dictionary as one HTML page per letter.
//! Every entry is a paragraph of the form
//!
//! ```text
//! <P><B>Abacus</B> (<I>n.</I>) A table or tray strewn with sand.</P>
//! ```
//!
//! Pages are read from a local directory; fetching them is left to the
//! caller. Any paragraph that does not have this exact shape aborts the
//! read, since skipping it would silently drop part of the dictionary.

use std::path::{Path, PathBuf};

use defgraph_core::{DefinitionRecord, DefinitionSource, GraphError, Result};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b.*?</p>").unwrap());
static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^<p>\s*<b>([^<]*)</b>\s*\(<i>([^<]*)</i>\)\s([^<]*)</p>$").unwrap()
});

const ALL_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";

/// OPTED pages in a local directory
#[derive(Debug, Clone)]
pub struct OptedSource {
    dir: PathBuf,
    letters: String,
}

impl OptedSource {
    /// Read every letter's page from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            letters: ALL_LETTERS.to_string(),
        }
    }

    /// Restrict the source to the pages of `letters`
    pub fn with_letters(mut self, letters: impl Into<String>) -> Self {
        self.letters = letters.into();
        self
    }

    /// Page file for `letter`: `<letter>.html`, else `wb1913_<letter>.html`
    pub fn page_path(&self, letter: char) -> PathBuf {
        let short = self.dir.join(format!("{letter}.html"));
        if short.is_file() {
            return short;
        }
        self.dir.join(format!("wb1913_{letter}.html"))
    }

    fn read_page(&self, letter: char) -> Result<Vec<DefinitionRecord>> {
        let path = self.page_path(letter);
        let html = std::fs::read_to_string(&path).map_err(|e| GraphError::Io {
            path: path.clone(),
            source: e,
        })?;
        let records = parse_page(&path, &html)?;
        tracing::debug!("Letter {}: {} entries", letter, records.len());
        Ok(records)
    }
}

impl DefinitionSource for OptedSource {
    fn name(&self) -> &str {
        "OPTED"
    }

    fn records(&self) -> Result<Vec<DefinitionRecord>> {
        let mut records = Vec::new();
        for letter in self.letters.chars() {
            records.extend(self.read_page(letter)?);
        }
        tracing::info!(
            "Read {} OPTED entries from {}",
            records.len(),
            self.dir.display()
        );
        Ok(records)
    }
}

/// Extract the entries of one page
///
/// Only the part after `<body>` is scanned when the page has one.
pub fn parse_page(path: &Path, html: &str) -> Result<Vec<DefinitionRecord>> {
    let body = match html.to_ascii_lowercase().find("<body") {
        Some(start) => &html[start..],
        None => html,
    };

    PARAGRAPH
        .find_iter(body)
        .map(|paragraph| {
            parse_entry(paragraph.as_str()).ok_or_else(|| malformed(path, paragraph.as_str()))
        })
        .collect()
}

/// Parse a single `<P>` entry
///
/// Character references (`&amp;`, `&#39;`, ...) are decoded in every field.
pub fn parse_entry(paragraph: &str) -> Option<DefinitionRecord> {
    let captures = ENTRY.captures(paragraph.trim())?;
    let field = |i: usize| decode_html_entities(captures[i].trim()).trim().to_string();
    Some(DefinitionRecord::new(field(1), field(2), field(3)))
}

fn malformed(path: &Path, paragraph: &str) -> GraphError {
    let excerpt: String = paragraph.chars().take(80).collect();
    GraphError::MalformedRecord {
        source_name: path.display().to_string(),
        reason: format!("unexpected entry shape: {excerpt}"),
    }
}
