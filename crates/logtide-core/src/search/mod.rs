//! Search — asynchronous full-text index over stored entries.
//!
//! [`SearchIndex`] is a cheap, cloneable handle. Writes are queued to a
//! background worker and never block the caller; the worker applies them in
//! batches and rebuilds term dictionaries after each batch. Queries read the
//! shared index directly, so a result may lag the store by the ops still in
//! the queue. [`SearchIndex::flush`] waits for the queue to drain.
//!
//! The op queue is unbounded but cannot run away from the store: every op
//! is produced by one store append, eviction batch or clear, holds only
//! `Arc` handles to entries the store already owns, and the worker drains
//! the whole queue on each wake-up. Ingest stays synchronous and never
//! waits on the index.
//!
//! The store stays authoritative: callers intersect results with a store
//! snapshot, and when the index is unavailable they fall back to the plain
//! substring filter.

pub mod analysis;
pub mod index;
pub mod query;

pub use index::{InvertedIndex, SearchOptions};
pub use query::{classify, is_pure_term, Query, QueryKind};

use crate::config::SearchConfig;
use crate::error::IndexError;
use crate::types::{FieldHighlights, LogEntry};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// One scored hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: Arc<LogEntry>,
    pub highlights: FieldHighlights,
    pub score: f32,
}

enum IndexOp {
    Upsert(Arc<LogEntry>),
    Remove(Vec<Arc<LogEntry>>),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

#[derive(Clone)]
pub struct SearchIndex {
    index: Arc<RwLock<InvertedIndex>>,
    ops: mpsc::UnboundedSender<IndexOp>,
    options: SearchOptions,
}

impl std::fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndex")
            .field("available", &self.is_available())
            .field("options", &self.options)
            .finish()
    }
}

impl SearchIndex {
    /// Start the index worker on the current tokio runtime.
    pub fn spawn(config: &SearchConfig) -> Self {
        let index = Arc::new(RwLock::new(InvertedIndex::new()));
        let (ops, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(index.clone(), rx));
        Self {
            index,
            ops,
            options: SearchOptions {
                limit: config.result_limit,
                message_boost: config.message_boost,
            },
        }
    }

    /// False once the worker has stopped.
    pub fn is_available(&self) -> bool {
        !self.ops.is_closed()
    }

    fn send(&self, op: IndexOp) -> Result<(), IndexError> {
        self.ops.send(op).map_err(|_| IndexError::Unavailable)
    }

    /// Queue `entry` for indexing.
    pub fn index_entry(&self, entry: Arc<LogEntry>) {
        if let Err(err) = self.send(IndexOp::Upsert(entry)) {
            debug!(error = %err, "dropping index update");
        }
    }

    /// Queue removal of `entries` (evicted or cleared from the store).
    pub fn remove_entries(&self, entries: &[Arc<LogEntry>]) {
        if entries.is_empty() {
            return;
        }
        if let Err(err) = self.send(IndexOp::Remove(entries.to_vec())) {
            debug!(error = %err, "dropping index removal");
        }
    }

    /// Wait until every op queued before this call has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.send(IndexOp::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Stop the worker. Pending ops queued before the call are still applied.
    pub fn shutdown(&self) {
        let _ = self.send(IndexOp::Shutdown);
    }

    /// Run `raw` against the index, keeping at most `search.result_limit`
    /// results. Blank input yields no results.
    pub fn search(&self, raw: &str, scope: Option<&str>) -> Result<Vec<SearchResult>, IndexError> {
        self.search_up_to(raw, scope, self.options.limit)
    }

    /// Like [`SearchIndex::search`] with an explicit result cap.
    pub fn search_up_to(&self, raw: &str, scope: Option<&str>, limit: usize) -> Result<Vec<SearchResult>, IndexError> {
        if !self.is_available() {
            return Err(IndexError::Unavailable);
        }
        let Some(query) = Query::parse(raw)? else {
            return Ok(Vec::new());
        };
        let options = SearchOptions { limit, ..self.options };
        Ok(self.index.read().search(&query, scope, options))
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, entry: &LogEntry) -> bool {
        self.index.read().contains(&entry.key())
    }
}

async fn run_worker(index: Arc<RwLock<InvertedIndex>>, mut rx: mpsc::UnboundedReceiver<IndexOp>) {
    let mut stopping = false;
    while !stopping {
        let Some(first) = rx.recv().await else { break };
        let mut batch = vec![first];
        while let Ok(op) = rx.try_recv() {
            batch.push(op);
        }

        let mut waiters = Vec::new();
        {
            let mut index = index.write();
            for op in batch {
                match op {
                    IndexOp::Upsert(entry) => index.upsert(entry),
                    IndexOp::Remove(entries) => {
                        for entry in &entries {
                            index.remove(entry);
                        }
                    }
                    IndexOp::Flush(tx) => waiters.push(tx),
                    IndexOp::Shutdown => stopping = true,
                }
            }
            index.commit();
        }
        for tx in waiters {
            let _ = tx.send(());
        }
    }
    debug!("search index worker stopped");
}
