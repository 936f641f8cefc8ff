//! Store — bounded per-source buffers of [`LogEntry`] values.
//!
//! The store is the single source of truth; views, exports and search results
//! are all resolved against it. Each source owns its own lock, so a tail task
//! appending to one source never contends with a reader of another. Within a
//! source, mutation takes the write lock and reads take the read lock.
//!
//! Entries are kept in insertion order. Display ordering by timestamp is the
//! view layer's job.

use crate::types::LogEntry;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

type Buffer = Arc<RwLock<VecDeque<Arc<LogEntry>>>>;

/// Result of an [`LogStore::append`].
#[derive(Debug)]
pub struct Appended {
    /// The stored entry, shared with whoever needs to index or display it.
    pub entry: Arc<LogEntry>,
    /// Entries pushed out of the front of the buffer to make room.
    pub evicted: Vec<Arc<LogEntry>>,
}

#[derive(Debug)]
pub struct LogStore {
    max_lines: usize,
    buffers: RwLock<HashMap<String, Buffer>>,
}

impl LogStore {
    /// A store retaining at most `max_lines` entries per source. Zero is
    /// raised to one; configuration loading rejects it before it gets here.
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            buffers: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    fn buffer(&self, source: &str) -> Option<Buffer> {
        self.buffers.read().get(source).cloned()
    }

    fn buffer_or_create(&self, source: &str) -> Buffer {
        if let Some(buffer) = self.buffer(source) {
            return buffer;
        }
        self.buffers
            .write()
            .entry(source.to_string())
            .or_default()
            .clone()
    }

    /// Append `entry` to `source`, evicting the oldest entries once the
    /// buffer is over capacity.
    pub fn append(&self, source: &str, entry: LogEntry) -> Appended {
        let entry = Arc::new(entry);
        let buffer = self.buffer_or_create(source);
        let mut entries = buffer.write();
        entries.push_back(entry.clone());

        let overflow = entries.len().saturating_sub(self.max_lines);
        let evicted: Vec<_> = entries.drain(..overflow).collect();
        Appended { entry, evicted }
    }

    /// Snapshot of `source` in insertion order. Empty for unknown sources.
    pub fn get_all(&self, source: &str) -> Vec<Arc<LogEntry>> {
        self.buffer(source)
            .map(|buffer| buffer.read().iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, source: &str) -> usize {
        self.buffer(source).map(|b| b.read().len()).unwrap_or(0)
    }

    pub fn is_empty(&self, source: &str) -> bool {
        self.len(source) == 0
    }

    /// Whether `source` has ever been written to or explicitly opened.
    pub fn has_source(&self, source: &str) -> bool {
        self.buffers.read().contains_key(source)
    }

    /// Open an empty buffer for `source` if none exists yet.
    pub fn ensure_source(&self, source: &str) {
        self.buffer_or_create(source);
    }

    /// Drop every entry of `source`, returning what was removed.
    pub fn clear(&self, source: &str) -> Vec<Arc<LogEntry>> {
        self.buffer(source)
            .map(|buffer| buffer.write().drain(..).collect())
            .unwrap_or_default()
    }

    /// Names of all sources with a buffer, sorted.
    pub fn sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buffers.read().keys().cloned().collect();
        names.sort();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
