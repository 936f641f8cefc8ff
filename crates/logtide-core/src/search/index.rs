//! In-memory inverted index.
//!
//! Every entry becomes one document with a `message` text field, `level` and
//! `source` keyword fields, and one text field per structured entry field.
//! Postings keep token positions and byte spans so phrase matches and
//! highlights come straight out of the index.
//!
//! A blank message contributes no message terms; level and source are
//! always indexed, so every stored entry has a document.
//!
//! Each field keeps an `fst::Set` term dictionary for prefix, wildcard and
//! substring expansion. Dictionaries are rebuilt by [`InvertedIndex::commit`];
//! until then new terms are only reachable through exact lookups.

use super::SearchResult;
use crate::search::analysis::{self, Token};
use crate::search::query::{Clause, Matcher, Occur, Query, StructuredQuery};
use crate::types::{EntryKey, FieldHighlights, LogEntry, Span, FIELD_LEVEL, FIELD_MESSAGE, FIELD_SOURCE};
use fst::{Automaton, IntoStreamer, Streamer};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

type DocId = u64;

#[derive(Debug, Default)]
struct Posting {
    positions: Vec<u32>,
    spans: Vec<Span>,
}

#[derive(Debug)]
struct FieldIndex {
    /// Field name as reported in highlights.
    name: String,
    keyword: bool,
    postings: BTreeMap<String, HashMap<DocId, Posting>>,
    lengths: HashMap<DocId, u32>,
    dictionary: Option<fst::Set<Vec<u8>>>,
    dirty: bool,
}

impl FieldIndex {
    fn new(name: &str, keyword: bool) -> Self {
        Self {
            name: name.to_string(),
            keyword,
            postings: BTreeMap::new(),
            lengths: HashMap::new(),
            dictionary: None,
            dirty: false,
        }
    }

    fn expand(&self, selector: &TermSelector<'_>) -> Vec<String> {
        let Some(dictionary) = &self.dictionary else {
            return Vec::new();
        };
        let mut terms = Vec::new();
        match selector {
            TermSelector::Prefix(prefix) => {
                let automaton = fst::automaton::Str::new(prefix).starts_with();
                let mut stream = dictionary.search(automaton).into_stream();
                while let Some(term) = stream.next() {
                    terms.push(String::from_utf8_lossy(term).into_owned());
                }
            }
            TermSelector::Pattern(pattern) => {
                let mut stream = dictionary.stream();
                while let Some(term) = stream.next() {
                    match std::str::from_utf8(term) {
                        Ok(term) if pattern.is_match(term) => terms.push(term.to_string()),
                        _ => {}
                    }
                }
            }
            TermSelector::Contains(needle) => {
                let mut stream = dictionary.stream();
                while let Some(term) = stream.next() {
                    match std::str::from_utf8(term) {
                        Ok(term) if term.contains(needle) => terms.push(term.to_string()),
                        _ => {}
                    }
                }
            }
        }
        terms
    }
}

enum TermSelector<'a> {
    Prefix(&'a str),
    Pattern(&'a Regex),
    /// Terms containing this case-folded literal.
    Contains(&'a str),
}

#[derive(Debug)]
struct Doc {
    entry: Arc<LogEntry>,
    /// Distinct terms per field, for removal.
    terms: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Default)]
struct Hit {
    score: f32,
    highlights: FieldHighlights,
}

impl Hit {
    fn absorb(&mut self, field: &str, score: f32, spans: &[Span]) {
        self.score += score;
        self.highlights
            .entry(field.to_string())
            .or_default()
            .extend_from_slice(spans);
    }

    fn merge(&mut self, other: Hit) {
        self.score += other.score;
        for (field, spans) in other.highlights {
            self.highlights.entry(field).or_default().extend(spans);
        }
    }
}

/// Knobs applied at query time.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub limit: usize,
    /// Weight of message matches in simple-term queries.
    pub message_boost: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: 1000, message_boost: 1.5 }
    }
}

#[derive(Debug, Default)]
pub struct InvertedIndex {
    ids: HashMap<EntryKey, DocId>,
    docs: HashMap<DocId, Doc>,
    fields: HashMap<String, FieldIndex>,
    next_id: DocId,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.ids.contains_key(key)
    }

    /// Index `entry` under its [`EntryKey`], replacing any document that
    /// already has the same key.
    pub fn upsert(&mut self, entry: Arc<LogEntry>) {
        let key = entry.key();
        if let Some(id) = self.ids.remove(&key) {
            self.drop_doc(id);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut terms = Vec::new();
        terms.extend(self.index_field(id, FIELD_MESSAGE, FIELD_MESSAGE, false, &entry.message));
        terms.extend(self.index_field(id, FIELD_LEVEL, FIELD_LEVEL, true, entry.level.as_str()));
        terms.extend(self.index_field(id, FIELD_SOURCE, FIELD_SOURCE, true, &entry.source));
        for (name, value) in &entry.fields {
            let field = name.to_lowercase();
            if matches!(field.as_str(), FIELD_MESSAGE | FIELD_LEVEL | FIELD_SOURCE) {
                continue;
            }
            terms.extend(self.index_field(id, &field, name, false, &LogEntry::field_text(value)));
        }

        self.ids.insert(key, id);
        self.docs.insert(id, Doc { entry, terms });
    }

    fn index_field(
        &mut self,
        id: DocId,
        field: &str,
        display: &str,
        keyword: bool,
        text: &str,
    ) -> Option<(String, Vec<String>)> {
        let tokens = if keyword {
            let term = analysis::keyword(text);
            if term.is_empty() {
                Vec::new()
            } else {
                vec![Token { term, span: Span::new(0, text.len()) }]
            }
        } else {
            analysis::tokenize(text)
        };
        if tokens.is_empty() {
            return None;
        }

        let index = self
            .fields
            .entry(field.to_string())
            .or_insert_with(|| FieldIndex::new(display, keyword));
        index.lengths.insert(id, tokens.len() as u32);

        let mut distinct = Vec::new();
        for (position, token) in tokens.into_iter().enumerate() {
            if !index.postings.contains_key(&token.term) {
                index.dirty = true;
            }
            let posting = index
                .postings
                .entry(token.term.clone())
                .or_default()
                .entry(id)
                .or_default();
            if posting.positions.is_empty() {
                distinct.push(token.term);
            }
            posting.positions.push(position as u32);
            posting.spans.push(token.span);
        }
        Some((field.to_string(), distinct))
    }

    /// Drop the document of `entry`.
    ///
    /// Entries sharing a key share one document, held by the most recently
    /// indexed copy. Removing any other copy leaves that document in place.
    /// Returns false when nothing was dropped.
    pub fn remove(&mut self, entry: &Arc<LogEntry>) -> bool {
        let key = entry.key();
        let Some(&id) = self.ids.get(&key) else {
            return false;
        };
        if !self.docs.get(&id).is_some_and(|doc| Arc::ptr_eq(&doc.entry, entry)) {
            return false;
        }
        self.ids.remove(&key);
        self.drop_doc(id);
        true
    }

    fn drop_doc(&mut self, id: DocId) {
        let Some(doc) = self.docs.remove(&id) else {
            return;
        };
        for (field, terms) in doc.terms {
            let Some(index) = self.fields.get_mut(&field) else {
                continue;
            };
            index.lengths.remove(&id);
            for term in terms {
                if let Some(docs) = index.postings.get_mut(&term) {
                    docs.remove(&id);
                    if docs.is_empty() {
                        index.postings.remove(&term);
                        index.dirty = true;
                    }
                }
            }
        }
    }

    /// Rebuild stale term dictionaries.
    pub fn commit(&mut self) {
        for index in self.fields.values_mut().filter(|f| f.dirty) {
            index.dictionary = match fst::Set::from_iter(index.postings.keys()) {
                Ok(set) => Some(set),
                Err(err) => {
                    warn!(field = %index.name, error = %err, "failed to build term dictionary");
                    None
                }
            };
            index.dirty = false;
        }
    }

    /// Run `query`, keeping only documents from `scope` when given. Results
    /// are ordered by descending score, then by timestamp.
    pub fn search(&self, query: &Query, scope: Option<&str>, options: SearchOptions) -> Vec<SearchResult> {
        let hits = match query {
            Query::Simple(term) => self.eval_simple(term, options.message_boost),
            Query::Structured(query) => self.eval_structured(query),
        };

        let mut results: Vec<SearchResult> = hits
            .into_iter()
            .filter_map(|(id, mut hit)| {
                let doc = self.docs.get(&id)?;
                if scope.is_some_and(|source| doc.entry.source != source) {
                    return None;
                }
                for spans in hit.highlights.values_mut() {
                    spans.sort();
                    spans.dedup();
                }
                Some(SearchResult {
                    entry: doc.entry.clone(),
                    highlights: hit.highlights,
                    score: hit.score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.entry.ts.cmp(&b.entry.ts))
        });
        results.truncate(options.limit);
        results
    }

    fn idf(&self, doc_freq: usize) -> f32 {
        1.0 + (self.docs.len() as f32 / (doc_freq as f32 + 1.0)).ln()
    }

    fn score(&self, field: &FieldIndex, id: DocId, tf: usize, idf: f32, boost: f32) -> f32 {
        let len = field.lengths.get(&id).copied().unwrap_or(1).max(1);
        (tf as f32).sqrt() * idf / (len as f32).sqrt() * boost
    }

    fn score_terms(&self, field: &FieldIndex, terms: &[String], boost: f32, hits: &mut HashMap<DocId, Hit>) {
        for term in terms {
            let Some(docs) = field.postings.get(term) else {
                continue;
            };
            let idf = self.idf(docs.len());
            for (&id, posting) in docs {
                let score = self.score(field, id, posting.positions.len(), idf, boost);
                hits.entry(id).or_default().absorb(&field.name, score, &posting.spans);
            }
        }
    }

    fn score_phrase(&self, field: &FieldIndex, tokens: &[String], hits: &mut HashMap<DocId, Hit>) {
        if field.keyword {
            self.score_terms(field, &[tokens.join(" ")], 1.0, hits);
            return;
        }
        let Some((first, rest)) = tokens.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.score_terms(field, &[first.clone()], 1.0, hits);
            return;
        }
        let Some(head) = field.postings.get(first) else {
            return;
        };
        let Some(tails) = rest
            .iter()
            .map(|t| field.postings.get(t))
            .collect::<Option<Vec<_>>>()
        else {
            return;
        };

        let idf: f32 = tokens
            .iter()
            .filter_map(|t| field.postings.get(t))
            .map(|docs| self.idf(docs.len()))
            .sum();

        for (&id, posting) in head {
            let Some(following) = tails.iter().map(|docs| docs.get(&id)).collect::<Option<Vec<_>>>() else {
                continue;
            };
            let spans = phrase_spans(posting, &following);
            if spans.is_empty() {
                continue;
            }
            let score = self.score(field, id, spans.len(), idf, 1.0);
            hits.entry(id).or_default().absorb(&field.name, score, &spans);
        }
    }

    fn eval_matcher(&self, field: &FieldIndex, matcher: &Matcher, hits: &mut HashMap<DocId, Hit>) {
        match matcher {
            Matcher::Term(value) if field.keyword => {
                self.score_terms(field, &[analysis::keyword(value)], 1.0, hits);
            }
            Matcher::Term(value) => {
                let tokens: Vec<String> = analysis::tokenize(value).into_iter().map(|t| t.term).collect();
                self.score_phrase(field, &tokens, hits);
            }
            Matcher::Phrase(tokens) => self.score_phrase(field, tokens, hits),
            Matcher::Wildcard(pattern) => {
                let terms = match analysis::wildcard_prefix(pattern) {
                    Some(prefix) => field.expand(&TermSelector::Prefix(prefix)),
                    None => match analysis::wildcard_matcher(pattern) {
                        Ok(matcher) => field.expand(&TermSelector::Pattern(&matcher)),
                        Err(err) => {
                            warn!(field = %field.name, error = %err, "skipping wildcard clause");
                            return;
                        }
                    },
                };
                self.score_terms(field, &terms, 1.0, hits);
            }
        }
    }

    fn eval_clause(&self, clause: &Clause) -> HashMap<DocId, Hit> {
        let mut hits = HashMap::new();
        match &clause.field {
            Some(name) => {
                if let Some(field) = self.fields.get(name) {
                    self.eval_matcher(field, &clause.matcher, &mut hits);
                }
            }
            None => {
                for field in self.fields.values() {
                    self.eval_matcher(field, &clause.matcher, &mut hits);
                }
            }
        }
        hits
    }

    fn eval_structured(&self, query: &StructuredQuery) -> HashMap<DocId, Hit> {
        let mut required: Option<HashMap<DocId, Hit>> = None;
        let mut optional: HashMap<DocId, Hit> = HashMap::new();
        let mut has_optional = false;
        let mut excluded = HashSet::new();

        for clause in &query.clauses {
            let hits = self.eval_clause(clause);
            match clause.occur {
                Occur::Must => {
                    required = Some(match required.take() {
                        None => hits,
                        Some(mut acc) => {
                            acc.retain(|id, _| hits.contains_key(id));
                            for (id, hit) in hits {
                                if let Some(existing) = acc.get_mut(&id) {
                                    existing.merge(hit);
                                }
                            }
                            acc
                        }
                    });
                }
                Occur::Should => {
                    has_optional = true;
                    for (id, hit) in hits {
                        optional.entry(id).or_default().merge(hit);
                    }
                }
                Occur::MustNot => excluded.extend(hits.into_keys()),
            }
        }

        let mut result = match required {
            Some(mut acc) => {
                for (id, hit) in optional {
                    if let Some(existing) = acc.get_mut(&id) {
                        existing.merge(hit);
                    }
                }
                acc
            }
            None if has_optional => optional,
            None => self.docs.keys().map(|&id| (id, Hit::default())).collect(),
        };
        result.retain(|id, _| !excluded.contains(id));
        result
    }

    /// Substring disjunction over message, level and source.
    ///
    /// Matching goes through the term dictionaries; highlights are then taken
    /// from the field text so they cover exactly the matched substring.
    fn eval_simple(&self, term: &str, message_boost: f32) -> HashMap<DocId, Hit> {
        let needle = analysis::fold_case(term);
        let selector = TermSelector::Contains(&needle);
        let mut hits: HashMap<DocId, Hit> = HashMap::new();

        for (name, boost) in [(FIELD_MESSAGE, message_boost), (FIELD_LEVEL, 1.0), (FIELD_SOURCE, 1.0)] {
            let Some(field) = self.fields.get(name) else {
                continue;
            };
            self.score_terms(field, &field.expand(&selector), boost, &mut hits);
        }

        for (id, hit) in hits.iter_mut() {
            let Some(doc) = self.docs.get(id) else {
                continue;
            };
            for (field, spans) in hit.highlights.iter_mut() {
                let text = match field.as_str() {
                    FIELD_MESSAGE => doc.entry.message.as_str(),
                    FIELD_LEVEL => doc.entry.level.as_str(),
                    _ => doc.entry.source.as_str(),
                };
                *spans = analysis::find_literal(term, text);
            }
        }
        hits
    }
}

/// Spans covering each occurrence of `head` followed by `following` at
/// consecutive positions.
fn phrase_spans(head: &Posting, following: &[&Posting]) -> Vec<Span> {
    head.positions
        .iter()
        .zip(&head.spans)
        .filter_map(|(&position, span)| {
            let mut end = span.end;
            for (offset, posting) in following.iter().enumerate() {
                let want = position + offset as u32 + 1;
                let at = posting.positions.binary_search(&want).ok()?;
                end = posting.spans[at].end;
            }
            Some(Span::new(span.start, end))
        })
        .collect()
}
