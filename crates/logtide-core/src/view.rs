//! View — the Presenter-facing, filtered and ordered projection of a source.
//!
//! Rows are always ordered by timestamp (stable, so equal timestamps keep
//! insertion order) and are always drawn from a store snapshot, never from
//! the index alone.

use crate::search::{analysis, SearchResult};
use crate::types::{EntryKey, FieldHighlights, LogEntry, FIELD_LEVEL, FIELD_MESSAGE, FIELD_SOURCE};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ViewRow {
    pub entry: Arc<LogEntry>,
    pub highlights: FieldHighlights,
    /// Index score, when the row came from an index query.
    pub score: Option<f32>,
}

impl ViewRow {
    fn plain(entry: Arc<LogEntry>) -> Self {
        Self {
            entry,
            highlights: FieldHighlights::new(),
            score: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogView {
    pub rows: Vec<ViewRow>,
    /// Entries in the source before filtering.
    pub total: usize,
}

impl LogView {
    pub fn unfiltered(entries: Vec<Arc<LogEntry>>) -> Self {
        let total = entries.len();
        Self::ordered(entries.into_iter().map(ViewRow::plain).collect(), total)
    }

    /// Case-insensitive substring match over message, level and source.
    /// Matching rows also carry highlights for entry field values.
    pub fn substring(entries: Vec<Arc<LogEntry>>, term: &str) -> Self {
        let total = entries.len();
        let rows = entries
            .into_iter()
            .filter_map(|entry| {
                let mut highlights = FieldHighlights::new();
                for (field, text) in [
                    (FIELD_MESSAGE, entry.message.as_str()),
                    (FIELD_LEVEL, entry.level.as_str()),
                    (FIELD_SOURCE, entry.source.as_str()),
                ] {
                    let spans = analysis::find_literal(term, text);
                    if !spans.is_empty() {
                        highlights.insert(field.to_string(), spans);
                    }
                }
                if highlights.is_empty() {
                    return None;
                }
                for (key, value) in &entry.fields {
                    let spans = analysis::find_literal(term, &LogEntry::field_text(value));
                    if !spans.is_empty() {
                        highlights.insert(key.clone(), spans);
                    }
                }
                Some(ViewRow { entry, highlights, score: None })
            })
            .collect();

        Self::ordered(rows, total)
    }

    /// Keep the store entries the index returned, with the index's
    /// highlights. Hits no longer in the store are dropped.
    pub fn from_results(entries: Vec<Arc<LogEntry>>, results: Vec<SearchResult>) -> Self {
        let total = entries.len();
        let hits: HashMap<EntryKey, SearchResult> =
            results.into_iter().map(|r| (r.entry.key(), r)).collect();

        let rows = entries
            .into_iter()
            .filter_map(|entry| {
                let hit = hits.get(&entry.key())?;
                Some(ViewRow {
                    highlights: hit.highlights.clone(),
                    score: Some(hit.score),
                    entry,
                })
            })
            .collect();

        Self::ordered(rows, total)
    }

    fn ordered(mut rows: Vec<ViewRow>, total: usize) -> Self {
        rows.sort_by_key(|row| row.entry.ts);
        Self { rows, total }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when rows were filtered out.
    pub fn is_filtered(&self) -> bool {
        self.rows.len() != self.total
    }

    /// `(n)` for an unfiltered view, `(shown of total)` otherwise.
    pub fn count_annotation(&self) -> String {
        if self.is_filtered() {
            format!("({} of {})", self.rows.len(), self.total)
        } else {
            format!("({})", self.total)
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<LogEntry>> {
        self.rows.iter().map(|row| &row.entry)
    }
}
