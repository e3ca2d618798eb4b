//! Whole-word search, highlight and replace-all over the plain document.
//!
//! Terms are matched literally, case-insensitively, and only on word
//! boundaries. A blank term matches nothing.

use std::ops::Range;

use regex::{NoExpand, Regex, RegexBuilder};
use thiserror::Error;

use crate::render::escape_html;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid search term: {0}")]
    InvalidTerm(String),
}

/// The document with every occurrence of `term` wrapped in `<mark>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHighlight {
    pub term: String,
    pub occurrences: usize,
    pub markup: String,
}

impl SearchHighlight {
    pub fn new(text: &str, term: &str) -> Result<Self, SearchError> {
        let ranges = find_word(text, term)?;

        let mut markup = String::with_capacity(text.len() + ranges.len() * 13);
        let mut cursor = 0;
        for range in &ranges {
            markup.push_str(&escape_html(&text[cursor..range.start]));
            markup.push_str("<mark>");
            markup.push_str(&escape_html(&text[range.clone()]));
            markup.push_str("</mark>");
            cursor = range.end;
        }
        markup.push_str(&escape_html(&text[cursor..]));

        Ok(Self {
            term: term.trim().to_string(),
            occurrences: ranges.len(),
            markup,
        })
    }
}

/// Byte ranges of every whole-word occurrence of `term`.
pub fn find_word(text: &str, term: &str) -> Result<Vec<Range<usize>>, SearchError> {
    let Some(regex) = word_regex(term)? else {
        return Ok(Vec::new());
    };
    Ok(regex.find_iter(text).map(|found| found.range()).collect())
}

/// Replaces every whole-word occurrence of `term` with `replacement`, taken
/// literally. Returns the new text and the number of replacements.
pub fn replace_word(
    text: &str,
    term: &str,
    replacement: &str,
) -> Result<(String, usize), SearchError> {
    let Some(regex) = word_regex(term)? else {
        return Ok((text.to_string(), 0));
    };

    let count = regex.find_iter(text).count();
    if count == 0 {
        return Ok((text.to_string(), 0));
    }
    let replaced = regex.replace_all(text, NoExpand(replacement)).into_owned();
    Ok((replaced, count))
}

fn word_regex(term: &str) -> Result<Option<Regex>, SearchError> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(None);
    }

    RegexBuilder::new(&format!(r"\b{}\b", regex::escape(term)))
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|err| SearchError::InvalidTerm(err.to_string()))
}
