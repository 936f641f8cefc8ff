//! Small entry sets shared across harnesses.

use crate::common::builders::LogEntryBuilder;
use logtide_core::{LogEntry, LogLevel};

/// Epoch milliseconds of 2024-01-15 10:30:00 UTC.
pub const BASE_MS: i64 = 1_705_314_600_000;

/// Eight `app` entries; only the fourth mentions "error" in any case.
///
/// The matching message is `"Database connection ERROR"`, so the match
/// covers bytes `20..25`.
pub fn one_error_in_eight() -> Vec<LogEntry> {
    const MESSAGES: [&str; 8] = [
        "Server listening on port 8080",
        "Accepted connection from 10.0.0.7",
        "Cache warmed with 512 keys",
        "Database connection ERROR",
        "Request completed in 12ms",
        "Scheduled job started",
        "Scheduled job finished",
        "Health check passed",
    ];
    MESSAGES
        .iter()
        .enumerate()
        .map(|(i, message)| LogEntryBuilder::new(*message).at_ms(BASE_MS + i as i64 * 1_000).build())
        .collect()
}

/// Five `app` entries with exactly one at WARN. No message contains "warn".
pub fn five_with_one_warning() -> Vec<(LogLevel, &'static str)> {
    vec![
        (LogLevel::Info, "Application started successfully"),
        (LogLevel::Debug, "Loading configuration from config.toml"),
        (LogLevel::Warn, "Deprecated API endpoint used"),
        (LogLevel::Info, "Database connection re-established"),
        (LogLevel::Info, "Logs view initialized"),
    ]
}
