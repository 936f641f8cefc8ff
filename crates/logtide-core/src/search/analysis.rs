//! Text analysis shared by the index and the plain filter.
//!
//! Text fields are split into maximal runs of alphanumeric characters and
//! lowercased. Keyword fields (level, source) are a single lowercased term.

use crate::error::IndexError;
use crate::types::Span;
use regex::{Regex, RegexBuilder};

/// One analysed token: lowercased text plus its byte span in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub span: Span,
}

pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(token(text, s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(token(text, s, text.len()));
    }
    tokens
}

fn token(text: &str, start: usize, end: usize) -> Token {
    Token {
        term: text[start..end].to_lowercase(),
        span: Span::new(start, end),
    }
}

pub fn keyword(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Lowercase `text` one char at a time, the same folding [`find_literal`]
/// applies.
pub fn fold_case(text: &str) -> String {
    text.chars().map(fold).collect()
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Non-overlapping case-insensitive occurrences of `needle` in `text`, as
/// byte spans of `text`.
pub fn find_literal(needle: &str, text: &str) -> Vec<Span> {
    let needle: Vec<char> = needle.chars().map(fold).collect();
    let mut spans = Vec::new();
    if needle.is_empty() {
        return spans;
    }
    let mut resume = 0;
    for (start, _) in text.char_indices() {
        if start < resume {
            continue;
        }
        if let Some(len) = literal_at(&needle, &text[start..]) {
            spans.push(Span::new(start, start + len));
            resume = start + len;
        }
    }
    spans
}

/// Byte length of the match of `needle` at the start of `text`, if any.
fn literal_at(needle: &[char], text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    for &want in needle {
        let (_, c) = chars.next()?;
        if fold(c) != want {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(i, _)| i))
}

/// Anchored matcher for a `*`/`?` wildcard pattern over lowercase terms.
///
/// Very long patterns can exceed the regex size limit; that is reported as
/// a query error.
pub fn wildcard_matcher(pattern: &str) -> Result<Regex, IndexError> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    RegexBuilder::new(&expr)
        .case_insensitive(true)
        .build()
        .map_err(|err| IndexError::Query(format!("wildcard pattern rejected: {err}")))
}

/// If `pattern` is a plain `prefix*`, return the prefix.
pub fn wildcard_prefix(pattern: &str) -> Option<&str> {
    let prefix = pattern.strip_suffix('*')?;
    (!prefix.is_empty() && !prefix.contains(['*', '?'])).then_some(prefix)
}
