//! Core types for logtide-core.
//!
//! This module defines the data structures shared across all layers: the
//! immutable [`LogEntry`], its [`LogLevel`], the [`SourceKind`] of the source
//! that produced it, and the neutral highlight [`Span`] the search layer
//! hands to the Presenter.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Highlight spans keyed by field name (`message`, `level`, `source`, or an
/// entry field key).
pub type FieldHighlights = BTreeMap<String, Vec<Span>>;

pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_SOURCE: &str = "source";

/// Number of message characters folded into an [`EntryKey`].
const KEY_MESSAGE_PREFIX: usize = 50;

/// A log entry as held by the store.
///
/// Entries are built once at ingestion and shared as `Arc<LogEntry>` from then
/// on; nothing mutates them after they reach the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Event time (UTC). Remote events use the backend timestamp.
    pub ts: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Name of the catalog source this entry belongs to.
    pub source: String,
    /// Structured fields, ordered by key.
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// A new entry stamped with the current time.
    pub fn new(source: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            level,
            message: message.into(),
            source: source.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Deterministic identity used by the search index.
    ///
    /// Two entries with the same source, timestamp and first 50 message
    /// characters share a key; the index treats that as an overwrite.
    pub fn key(&self) -> EntryKey {
        let prefix: String = self.message.chars().take(KEY_MESSAGE_PREFIX).collect();
        EntryKey(format!(
            "{}_{}_{}",
            self.source,
            self.ts.timestamp_nanos_opt().unwrap_or_default(),
            prefix
        ))
    }

    /// Render an entry field value as plain text.
    pub fn field_text(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Index identity of a [`LogEntry`], see [`LogEntry::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(pub String);

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

static LEVEL_ALIASES: phf::Map<&'static str, LogLevel> = phf::phf_map! {
    "trace" => LogLevel::Debug,
    "debug" => LogLevel::Debug,
    "dbg" => LogLevel::Debug,
    "info" => LogLevel::Info,
    "information" => LogLevel::Info,
    "notice" => LogLevel::Info,
    "warn" => LogLevel::Warn,
    "warning" => LogLevel::Warn,
    "error" => LogLevel::Error,
    "err" => LogLevel::Error,
    "fatal" => LogLevel::Fatal,
    "critical" => LogLevel::Fatal,
    "crit" => LogLevel::Fatal,
    "panic" => LogLevel::Fatal,
    "emerg" => LogLevel::Fatal,
};

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Parse a level name or common alias, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        LEVEL_ALIASES.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }

    /// Best-effort level detection for messages that arrive without one.
    ///
    /// Recognises a leading level word (`ERROR ...`, `[warn] ...`,
    /// `WARN: ...`) or a logfmt-style `level=...` pair anywhere in the line.
    pub fn sniff(message: &str) -> Option<Self> {
        static LEADING: OnceLock<Regex> = OnceLock::new();
        static LOGFMT: OnceLock<Regex> = OnceLock::new();

        let leading = LEADING.get_or_init(|| {
            Regex::new(r"^\s*\[?\s*([A-Za-z]+)\s*[\]:]?(?:\s|$)").expect("valid level regex")
        });
        if let Some(level) = leading
            .captures(message)
            .and_then(|c| c.get(1))
            .and_then(|m| Self::parse(m.as_str()))
        {
            return Some(level);
        }

        let logfmt = LOGFMT.get_or_init(|| {
            Regex::new(r#"(?i)\b(?:level|lvl|severity)="?([A-Za-z]+)"#).expect("valid logfmt regex")
        });
        logfmt
            .captures(message)
            .and_then(|c| c.get(1))
            .and_then(|m| Self::parse(m.as_str()))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// What kind of backend feeds a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Memory,
    Remote,
    File,
    Command,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Memory => write!(f, "memory"),
            SourceKind::Remote => write!(f, "remote"),
            SourceKind::File => write!(f, "file"),
            SourceKind::Command => write!(f, "command"),
        }
    }
}

/// Byte range `[start, end)` inside one field's text.
///
/// Spans are rendering-neutral; turning them into styling is the Presenter's
/// job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn level_aliases_parse_case_insensitively() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("err"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse(" Critical "), Some(LogLevel::Fatal));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[rstest]
    #[case("ERROR failed to bind", Some(LogLevel::Error))]
    #[case("[warn] disk at 91%", Some(LogLevel::Warn))]
    #[case("WARN: retrying", Some(LogLevel::Warn))]
    #[case("ts=2024-01-15 level=fatal msg=oom", Some(LogLevel::Fatal))]
    #[case("GET /healthz 200", None)]
    fn sniff_leading_and_logfmt_levels(#[case] message: &str, #[case] expected: Option<LogLevel>) {
        assert_eq!(LogLevel::sniff(message), expected);
    }

    #[test]
    fn key_uses_source_timestamp_and_message_prefix() {
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let long = "x".repeat(80);
        let entry = LogEntry::new("remote", LogLevel::Info, long).at(ts);
        let key = entry.key();
        assert_eq!(key.0, format!("remote_1700000000123000000_{}", "x".repeat(50)));
    }

    #[test]
    fn key_prefix_respects_char_boundaries() {
        let entry = LogEntry::new("app", LogLevel::Info, "é".repeat(60));
        assert!(entry.key().0.ends_with(&"é".repeat(50)));
    }
}
