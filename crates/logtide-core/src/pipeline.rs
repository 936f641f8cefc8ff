//! Pipeline — the single write path from feeds into the store and index.
//!
//! Every append goes through [`LogPipeline::ingest`], which stores the entry,
//! queues it (and anything it evicted) with the search index, and bumps the
//! change counter. Subscribers receive the counter through a `watch`
//! channel, so bursts of appends coalesce into one wake-up.

use crate::config::Config;
use crate::error::IndexError;
use crate::search::{self, QueryKind, SearchIndex};
use crate::store::LogStore;
use crate::types::LogEntry;
use crate::view::LogView;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Severity of a status-line message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Info,
    Ok,
    Warn,
    Error,
}

/// The current status-line message.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub message: String,
    pub tone: StatusTone,
    pub at: DateTime<Utc>,
}

impl Status {
    pub fn new(tone: StatusTone, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tone,
            at: Utc::now(),
        }
    }
}

/// A view plus the index failure (if any) that forced the plain filter.
#[derive(Debug)]
pub struct FilteredView {
    pub view: LogView,
    pub index_error: Option<IndexError>,
}

#[derive(Debug)]
pub struct LogPipeline {
    store: LogStore,
    index: Option<SearchIndex>,
    changes: watch::Sender<u64>,
    status: Mutex<Status>,
}

impl LogPipeline {
    /// Build a pipeline from configuration. Spawns the index worker when
    /// search is enabled, so this must run inside a tokio runtime.
    pub fn new(config: &Config) -> Self {
        let index = config.search.enabled.then(|| SearchIndex::spawn(&config.search));
        Self::with_parts(LogStore::new(config.store.max_lines), index)
    }

    /// A pipeline that always uses the plain substring filter.
    pub fn without_index(max_lines: usize) -> Self {
        Self::with_parts(LogStore::new(max_lines), None)
    }

    fn with_parts(store: LogStore, index: Option<SearchIndex>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            store,
            index,
            changes,
            status: Mutex::new(Status::new(StatusTone::Info, "Ready")),
        }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn index(&self) -> Option<&SearchIndex> {
        self.index.as_ref()
    }

    /// Store `entry` under `source`, keep the index in step, and notify.
    pub fn ingest(&self, source: &str, entry: LogEntry) -> Arc<LogEntry> {
        let appended = self.store.append(source, entry);
        if let Some(index) = &self.index {
            index.remove_entries(&appended.evicted);
            index.index_entry(appended.entry.clone());
        }
        self.notify();
        appended.entry
    }

    /// Drop every entry of `source`. Returns how many were removed.
    pub fn clear(&self, source: &str) -> usize {
        let removed = self.store.clear(source);
        if let Some(index) = &self.index {
            index.remove_entries(&removed);
        }
        debug!(source, removed = removed.len(), "cleared source");
        self.notify();
        removed.len()
    }

    /// Build the display view of `source` under `filter`.
    ///
    /// Blank filters show everything. Pure single terms and structured
    /// queries go to the index, capped at the source's size rather than
    /// `search.result_limit`, and the results are intersected with the store
    /// snapshot. Anything else, or any index failure, uses the substring
    /// filter.
    pub fn view(&self, source: &str, filter: &str) -> FilteredView {
        let entries = self.store.get_all(source);
        let term = filter.trim();
        if term.is_empty() {
            return FilteredView { view: LogView::unfiltered(entries), index_error: None };
        }

        let indexed = match search::classify(filter) {
            QueryKind::Simple => search::is_pure_term(term),
            _ => true,
        };
        let index = match &self.index {
            Some(index) if indexed => index,
            _ => return FilteredView { view: LogView::substring(entries, term), index_error: None },
        };

        match index.search_up_to(filter, Some(source), entries.len()) {
            Ok(results) => FilteredView {
                view: LogView::from_results(entries, results),
                index_error: None,
            },
            Err(err) => {
                debug!(error = %err, filter, "index query failed, using substring filter");
                FilteredView {
                    view: LogView::substring(entries, term),
                    index_error: Some(err),
                }
            }
        }
    }

    pub fn set_status(&self, tone: StatusTone, message: impl Into<String>) {
        *self.status.lock() = Status::new(tone, message);
        self.notify();
    }

    pub fn status(&self) -> Status {
        self.status.lock().clone()
    }

    /// Receiver that changes whenever the store or status changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Wait for queued index updates to land.
    pub async fn flush_index(&self) {
        if let Some(index) = &self.index {
            index.flush().await;
        }
    }

    pub fn shutdown(&self) {
        if let Some(index) = &self.index {
            index.shutdown();
        }
    }
}
