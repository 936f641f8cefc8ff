//! Filter classification and the structured query language.
//!
//! A filter containing whitespace, a double quote or `*` is a structured
//! query; anything else is a simple term. Structured syntax:
//!
//! ```text
//! query   = clause { whitespace clause }
//! clause  = [ "+" | "-" ] [ field ":" ] value
//! value   = word | '"' phrase '"'
//! ```
//!
//! `+` marks a required clause, `-` an excluded one, and a bare clause is
//! optional (at least one optional clause must match when no clause is
//! required). Words may contain `*` and `?` wildcards. Without a field the
//! clause is matched against every indexed field.

use crate::error::IndexError;
use crate::search::analysis;

/// How a filter string is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Empty,
    Simple,
    Structured,
}

pub fn classify(raw: &str) -> QueryKind {
    if raw.trim().is_empty() {
        QueryKind::Empty
    } else if raw.contains(|c: char| c.is_whitespace() || c == '"' || c == '*') {
        QueryKind::Structured
    } else {
        QueryKind::Simple
    }
}

/// A simple term the index can answer exactly like the substring filter.
///
/// Terms containing separators can match across token boundaries, which the
/// token dictionary cannot see, so they take the plain filter instead.
pub fn is_pure_term(term: &str) -> bool {
    !term.is_empty() && term.chars().all(char::is_alphanumeric)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    Should,
    Must,
    MustNot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// A single word, analysed per field at match time.
    Term(String),
    /// Pre-analysed tokens that must appear consecutively.
    Phrase(Vec<String>),
    /// Lowercased pattern with `*`/`?`.
    Wildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub occur: Occur,
    /// Lowercased field name, or `None` for every field.
    pub field: Option<String>,
    pub matcher: Matcher,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuery {
    pub clauses: Vec<Clause>,
}

/// A parsed, non-empty filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Case-insensitive substring over message, level and source.
    Simple(String),
    Structured(StructuredQuery),
}

impl Query {
    /// Parse a raw filter. `Ok(None)` for blank input.
    pub fn parse(raw: &str) -> Result<Option<Query>, IndexError> {
        match classify(raw) {
            QueryKind::Empty => Ok(None),
            QueryKind::Simple => Ok(Some(Query::Simple(raw.trim().to_string()))),
            QueryKind::Structured => parse_structured(raw).map(|q| Some(Query::Structured(q))),
        }
    }
}

pub fn parse_structured(raw: &str) -> Result<StructuredQuery, IndexError> {
    let mut clauses = Vec::new();
    let mut chars = raw.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let Some(&(_, first)) = chars.peek() else { break };

        let occur = match first {
            '+' => Occur::Must,
            '-' => Occur::MustNot,
            _ => Occur::Should,
        };
        if occur != Occur::Should {
            chars.next();
        }

        let mut word = String::new();
        while let Some((_, c)) = chars.next_if(|(_, c)| !c.is_whitespace() && *c != '"') {
            word.push(c);
        }

        let quoted = chars.next_if(|(_, c)| *c == '"').is_some();
        let (field, matcher) = if quoted {
            let field = match word.as_str() {
                "" => None,
                w => Some(
                    w.strip_suffix(':')
                        .ok_or_else(|| IndexError::Query(format!("unexpected quote after {w:?}")))?,
                ),
            };
            let mut phrase = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                phrase.push(c);
            }
            if !closed {
                return Err(IndexError::Query("unterminated phrase".to_string()));
            }
            let tokens: Vec<String> = analysis::tokenize(&phrase).into_iter().map(|t| t.term).collect();
            if tokens.is_empty() {
                return Err(IndexError::Query("empty phrase".to_string()));
            }
            (field.map(str::to_string), Matcher::Phrase(tokens))
        } else {
            let (field, value) = split_field(&word)?;
            if value.is_empty() {
                return Err(IndexError::Query(match occur {
                    Occur::Should => format!("missing value for field {word:?}"),
                    _ => "operator without a value".to_string(),
                }));
            }
            let matcher = if value.contains(['*', '?']) {
                analysis::wildcard_matcher(value)?;
                Matcher::Wildcard(value.to_lowercase())
            } else {
                Matcher::Term(value.to_string())
            };
            (field.map(str::to_string), matcher)
        };

        clauses.push(Clause {
            occur,
            field: field.map(|f| f.to_lowercase()),
            matcher,
        });
    }

    if clauses.is_empty() {
        return Err(IndexError::Query("empty query".to_string()));
    }
    Ok(StructuredQuery { clauses })
}

/// Split `field:value`. A colon only names a field when the part before it
/// is a plain identifier, so `a/b:c` stays a value.
fn split_field(word: &str) -> Result<(Option<&str>, &str), IndexError> {
    match word.split_once(':') {
        Some(("", _)) => Err(IndexError::Query(format!("missing field name in {word:?}"))),
        Some((field, value))
            if field.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') =>
        {
            Ok((Some(field), value))
        }
        _ => Ok((None, word)),
    }
}
