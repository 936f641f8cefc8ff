//! Test builders — ergonomic constructors for `LogEntry` and pipelines.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use chrono::{DateTime, TimeZone, Utc};
use logtide_core::config::Config;
use logtide_core::{LogEntry, LogLevel, LogPipeline};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// LogEntryBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`LogEntry`] test fixtures.
///
/// # Example
///
/// ```rust,ignore
/// let entry = LogEntryBuilder::new("timeout connecting to db")
///     .level(LogLevel::Error)
///     .source("app")
///     .at_ms(1_705_314_600_000)
///     .field("request_id", "req-abc123")
///     .build();
/// ```
pub struct LogEntryBuilder {
    message: String,
    level: LogLevel,
    source: String,
    ts: DateTime<Utc>,
    fields: Vec<(String, serde_json::Value)>,
}

impl LogEntryBuilder {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Info,
            source: "app".to_string(),
            ts: Utc::now(),
            fields: Vec::new(),
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn ts(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }

    /// Timestamp from milliseconds since the epoch.
    pub fn at_ms(self, ms: i64) -> Self {
        self.ts(ts_ms(ms))
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> LogEntry {
        let mut entry = LogEntry::new(self.source, self.level, self.message).at(self.ts);
        entry.fields.extend(self.fields);
        entry
    }
}

pub fn ts_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().expect("valid test timestamp")
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// A pipeline with a running search index. Must be called inside a runtime.
pub fn indexed_pipeline(max_lines: usize) -> Arc<LogPipeline> {
    let mut config = Config::defaults();
    config.store.max_lines = max_lines;
    Arc::new(LogPipeline::new(&config))
}

/// A pipeline that always uses the substring filter.
pub fn plain_pipeline(max_lines: usize) -> Arc<LogPipeline> {
    Arc::new(LogPipeline::without_index(max_lines))
}

/// Ingest `entries` into their own sources and wait for the index.
pub async fn ingest_all(pipeline: &LogPipeline, entries: impl IntoIterator<Item = LogEntry>) {
    for entry in entries {
        let source = entry.source.clone();
        pipeline.ingest(&source, entry);
    }
    pipeline.flush_index().await;
}
