//! Remote log backend seam.
//!
//! [`RemoteLogFetcher`] is the surface logtide needs from a paginated,
//! stream-oriented log service: groups hold streams, streams are read in
//! pages, and a forward token continues where the last page stopped.
//! Implementations do not handle cancellation or timeouts themselves; the
//! tail task wraps every call with [`bounded`].

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use logtide_core::{FetchError, LogEntry, LogLevel};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A stream within a log group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub name: String,
    /// Time of the most recent event, in milliseconds since the epoch.
    pub last_event_ms: Option<i64>,
}

impl StreamDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_event_ms: None,
        }
    }
}

/// Opaque forward cursor for one (group, stream).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaginationToken(pub String);

/// One event as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    /// Event time in milliseconds since the epoch.
    pub timestamp_ms: Option<i64>,
    pub message: String,
    pub ingestion_time_ms: Option<i64>,
}

impl RemoteEvent {
    pub fn new(timestamp_ms: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            message: message.into(),
            ingestion_time_ms: None,
        }
    }

    pub fn ingested_at(mut self, ingestion_time_ms: i64) -> Self {
        self.ingestion_time_ms = Some(ingestion_time_ms);
        self
    }

    /// Convert into a store entry for `source`, tagged with where it came from.
    pub fn into_entry(self, source: &str, group: &str, stream: &str) -> LogEntry {
        let ts = self.timestamp_ms.and_then(millis).unwrap_or_else(Utc::now);
        let message = match self.message.strip_suffix('\n') {
            Some(trimmed) => trimmed.strip_suffix('\r').unwrap_or(trimmed).to_string(),
            None => self.message,
        };
        let level = LogLevel::sniff(&message).unwrap_or(LogLevel::Info);

        let mut entry = LogEntry::new(source, level, message)
            .at(ts)
            .with_field("group", group)
            .with_field("stream", stream);
        if let Some(ingested) = self.ingestion_time_ms.and_then(millis) {
            entry = entry.with_field("ingestionTime", ingested.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        entry
    }
}

fn millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// A page of events plus the cursor for the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<RemoteEvent>,
    pub next_token: Option<PaginationToken>,
}

#[async_trait]
pub trait RemoteLogFetcher: Send + Sync {
    /// Streams of `group`, most recently active first.
    async fn list_streams(&self, group: &str, limit: usize) -> Result<Vec<StreamDescriptor>, FetchError>;

    /// Read `limit` events from the head (oldest) or tail (newest) of a stream.
    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        limit: usize,
        from_head: bool,
    ) -> Result<EventPage, FetchError>;

    /// Read events after `token`.
    async fn get_events_by_token(
        &self,
        group: &str,
        stream: &str,
        token: &PaginationToken,
        limit: usize,
    ) -> Result<EventPage, FetchError>;

    /// Read events at or after `since`.
    async fn get_events_since(
        &self,
        group: &str,
        stream: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RemoteEvent>, FetchError>;
}

/// Run a fetch under `cancel`, and under `timeout` when one is given.
///
/// Cancellation wins over a result that becomes ready at the same time.
pub async fn bounded<T, F>(cancel: &CancellationToken, timeout: Option<Duration>, fetch: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    let fetch = async move {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .unwrap_or_else(|_| Err(FetchError::Timeout(limit))),
            None => fetch.await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = fetch => result,
    }
}
