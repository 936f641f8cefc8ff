//! In-process fake of a paginated remote log service.
//!
//! Groups hold named streams; each stream is an append-only list of events.
//! Forward tokens are `"<stream>:<offset>"`, so a token read continues from
//! exactly where the previous page stopped.
//!
//! Knobs for failure scenarios:
//! - [`FakeLogBackend::fail_stream`]: every call against that stream errors.
//! - [`FakeLogBackend::fail_listing`]: `list_streams` errors.
//! - [`FakeLogBackend::without_tokens`]: pages carry no token, forcing the
//!   time-based `get_events_since` path.
//! - [`FakeLogBackend::hold_polls`]: poll calls block until released, to
//!   hold a tick in flight.
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = FakeLogBackend::new();
//! backend.add_stream("/aws/lambda/orders", "s-1", 3);
//! backend.push_event("/aws/lambda/orders", "s-1", "late arrival");
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logtide_core::FetchError;
use logtide_feeds::{EventPage, PaginationToken, RemoteEvent, RemoteLogFetcher, StreamDescriptor};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Default)]
struct State {
    /// Group name → streams in listing order.
    groups: HashMap<String, Vec<(String, Vec<RemoteEvent>)>>,
    failing: HashSet<String>,
    listing_error: Option<String>,
    calls: Vec<String>,
}

/// See the module docs.
pub struct FakeLogBackend {
    state: Mutex<State>,
    tokens: AtomicBool,
    held: AtomicBool,
    release: Notify,
    poll_entered: Notify,
}

impl Default for FakeLogBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLogBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            tokens: AtomicBool::new(true),
            held: AtomicBool::new(false),
            release: Notify::new(),
            poll_entered: Notify::new(),
        }
    }

    /// Register `group` with no streams.
    pub fn add_group(&self, group: &str) {
        self.state.lock().groups.entry(group.to_string()).or_default();
    }

    /// Add a stream with `initial` events timestamped one minute in the past.
    pub fn add_stream(&self, group: &str, stream: &str, initial: usize) {
        let base = Utc::now().timestamp_millis() - 60_000;
        let events = (0..initial)
            .map(|i| RemoteEvent::new(base + i as i64, format!("{stream} initial {i}")))
            .collect();
        self.state
            .lock()
            .groups
            .entry(group.to_string())
            .or_default()
            .push((stream.to_string(), events));
    }

    /// Append an event stamped a second ahead of the wall clock, so it is
    /// newer than any cursor the tail holds.
    pub fn push_event(&self, group: &str, stream: &str, message: &str) {
        let event = RemoteEvent::new(Utc::now().timestamp_millis() + 1_000, message);
        let mut state = self.state.lock();
        if let Some((_, events)) = state
            .groups
            .get_mut(group)
            .and_then(|streams| streams.iter_mut().find(|(name, _)| name == stream))
        {
            events.push(event);
        }
    }

    pub fn fail_stream(&self, stream: &str) {
        self.state.lock().failing.insert(stream.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        self.state.lock().listing_error = Some(message.to_string());
    }

    pub fn without_tokens(self) -> Self {
        self.tokens.store(false, Ordering::SeqCst);
        self
    }

    /// Block every subsequent poll call until [`Self::release_polls`].
    pub fn hold_polls(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release_polls(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// Wait until a poll call has started.
    pub async fn poll_started(&self) {
        self.poll_entered.notified().await;
    }

    /// Method names of every call made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: &str) {
        self.state.lock().calls.push(call.to_string());
    }

    async fn gate(&self) {
        self.poll_entered.notify_one();
        if self.held.load(Ordering::SeqCst) {
            let released = self.release.notified();
            if self.held.load(Ordering::SeqCst) {
                released.await;
            }
        }
    }

    /// Every event of `stream`, or the injected failure.
    fn read(&self, group: &str, stream: &str) -> Result<Vec<RemoteEvent>, FetchError> {
        let state = self.state.lock();
        if state.failing.contains(stream) {
            return Err(FetchError::backend(format!("stream {stream} is unavailable")));
        }
        state
            .groups
            .get(group)
            .and_then(|streams| streams.iter().find(|(name, _)| name == stream))
            .map(|(_, events)| events.clone())
            .ok_or_else(|| FetchError::backend(format!("ResourceNotFoundException: {group}/{stream}")))
    }

    fn token(&self, stream: &str, offset: usize) -> Option<PaginationToken> {
        self.tokens
            .load(Ordering::SeqCst)
            .then(|| PaginationToken(format!("{stream}:{offset}")))
    }
}

#[async_trait]
impl RemoteLogFetcher for FakeLogBackend {
    async fn list_streams(&self, group: &str, limit: usize) -> Result<Vec<StreamDescriptor>, FetchError> {
        self.record("list_streams");
        let state = self.state.lock();
        if let Some(message) = &state.listing_error {
            return Err(FetchError::backend(message.clone()));
        }
        let streams = state
            .groups
            .get(group)
            .ok_or_else(|| FetchError::backend(format!("ResourceNotFoundException: {group}")))?;
        Ok(streams
            .iter()
            .take(limit)
            .map(|(name, events)| StreamDescriptor {
                name: name.clone(),
                last_event_ms: events.iter().filter_map(|e| e.timestamp_ms).max(),
            })
            .collect())
    }

    async fn get_events(&self, group: &str, stream: &str, limit: usize, from_head: bool) -> Result<EventPage, FetchError> {
        self.record("get_events");
        let events = self.read(group, stream)?;
        let total = events.len();
        let page = if from_head {
            events.into_iter().take(limit).collect()
        } else {
            events.into_iter().skip(total.saturating_sub(limit)).collect()
        };
        Ok(EventPage {
            events: page,
            next_token: self.token(stream, total),
        })
    }

    async fn get_events_by_token(
        &self,
        group: &str,
        stream: &str,
        token: &PaginationToken,
        limit: usize,
    ) -> Result<EventPage, FetchError> {
        self.record("get_events_by_token");
        self.gate().await;
        let offset: usize = token
            .0
            .rsplit(':')
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| FetchError::backend(format!("InvalidParameterException: bad token {}", token.0)))?;
        let events: Vec<RemoteEvent> = self.read(group, stream)?.into_iter().skip(offset).take(limit).collect();
        let next = offset + events.len();
        Ok(EventPage {
            events,
            next_token: self.token(stream, next),
        })
    }

    async fn get_events_since(
        &self,
        group: &str,
        stream: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RemoteEvent>, FetchError> {
        self.record("get_events_since");
        self.gate().await;
        let since = since.timestamp_millis();
        Ok(self
            .read(group, stream)?
            .into_iter()
            .filter(|e| e.timestamp_ms.is_some_and(|ts| ts >= since))
            .take(limit)
            .collect())
    }
}
