//! Local application source.
//!
//! The `app` source is fed in-process: a handful of representative entries
//! at startup, then whatever the application reports through
//! [`add_application_log`].

use chrono::{DateTime, Duration, Utc};
use logtide_core::registry::APP_SOURCE;
use logtide_core::{LogEntry, LogLevel, LogPipeline};
use serde_json::{json, Value};
use std::sync::Arc;

pub const REFRESH_MESSAGE: &str = "Logs refreshed manually";

/// The startup entries, spread over the five minutes before `now`.
pub fn seed_entries(now: DateTime<Utc>, sources_available: usize) -> Vec<LogEntry> {
    let entry = |minutes_ago: i64, level, message: &str| {
        LogEntry::new(APP_SOURCE, level, message).at(now - Duration::minutes(minutes_ago))
    };
    vec![
        entry(5, LogLevel::Info, "Application started successfully")
            .with_field("version", env!("CARGO_PKG_VERSION"))
            .with_field("pid", std::process::id()),
        entry(4, LogLevel::Debug, "Loading configuration from config.toml").with_field("config_file", "config.toml"),
        entry(3, LogLevel::Warn, "Deprecated API endpoint used")
            .with_field("endpoint", "/old-api")
            .with_field("replacement", "/new-api"),
        entry(2, LogLevel::Error, "Database connection failed")
            .with_field("error", "connection timeout")
            .with_field("retry_count", 3),
        entry(1, LogLevel::Info, "Database connection re-established").with_field("connection_time", "150ms"),
        entry(0, LogLevel::Info, "Logs view initialized").with_field("sources_available", sources_available),
    ]
}

pub fn seed(pipeline: &LogPipeline, sources_available: usize) {
    for entry in seed_entries(Utc::now(), sources_available) {
        pipeline.ingest(APP_SOURCE, entry);
    }
}

/// Append a synthetic entry to the application source.
pub fn add_application_log<I>(pipeline: &LogPipeline, level: LogLevel, message: &str, fields: I) -> Arc<LogEntry>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut entry = LogEntry::new(APP_SOURCE, level, message);
    entry.fields.extend(fields);
    pipeline.ingest(APP_SOURCE, entry)
}

/// Record a manual refresh of the application source.
pub fn refresh(pipeline: &LogPipeline) -> Arc<LogEntry> {
    add_application_log(
        pipeline,
        LogLevel::Info,
        REFRESH_MESSAGE,
        [("action".to_string(), json!("refresh"))],
    )
}
