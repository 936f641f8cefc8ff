//! Tail scheduler — initial load then continuous polling of remote groups.
//!
//! Each group gets one background task with its own [`CancellationToken`]:
//!
//! ```text
//! Idle ──► Loading ──► Tailing
//!   │         │           │
//!   └─────────┴───────────┴──► Stopped   (cancel, zero streams, describe failure)
//! ```
//!
//! The task is split into a producer (remote calls) and a consumer (store
//! appends) joined by a bounded channel. When the channel is full the
//! producer waits; nothing is dropped. The consumer re-checks the token
//! before every append, so once [`TailScheduler::stop`] returns no entry from
//! that task reaches the store.

use crate::remote::{bounded, PaginationToken, RemoteEvent, RemoteLogFetcher};
use chrono::{DateTime, TimeZone, Utc};
use logtide_core::config::TailConfig;
use logtide_core::{FetchError, LogEntry, LogPipeline, StatusTone};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Idle,
    Loading,
    Tailing,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct TailSettings {
    pub stream_limit: usize,
    pub initial_events: usize,
    pub poll_interval: Duration,
    pub poll_batch: usize,
    pub request_timeout: Duration,
    pub channel_capacity: usize,
}

impl From<&TailConfig> for TailSettings {
    fn from(config: &TailConfig) -> Self {
        Self {
            stream_limit: config.stream_limit,
            initial_events: config.initial_events,
            poll_interval: config.poll_interval(),
            poll_batch: config.poll_batch,
            request_timeout: config.request_timeout(),
            channel_capacity: config.channel_capacity.max(1),
        }
    }
}

impl Default for TailSettings {
    fn default() -> Self {
        Self::from(&TailConfig::default())
    }
}

struct GroupTail {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    state: watch::Receiver<TailState>,
}

pub struct TailScheduler {
    fetcher: Arc<dyn RemoteLogFetcher>,
    pipeline: Arc<LogPipeline>,
    settings: TailSettings,
    groups: Mutex<HashMap<String, GroupTail>>,
}

impl TailScheduler {
    pub fn new(fetcher: Arc<dyn RemoteLogFetcher>, pipeline: Arc<LogPipeline>, settings: TailSettings) -> Self {
        Self {
            fetcher,
            pipeline,
            settings,
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Load and then tail `group` into `source`.
    ///
    /// Any task already running for `group` is cancelled and awaited before
    /// the new one is spawned.
    pub async fn start(&self, group: &str, source: &str) -> watch::Receiver<TailState> {
        let mut groups = self.groups.lock().await;
        if let Some(previous) = groups.remove(group) {
            shut_down(group, previous).await;
        }

        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(TailState::Loading);
        let task = TailTask {
            fetcher: self.fetcher.clone(),
            pipeline: self.pipeline.clone(),
            settings: self.settings.clone(),
            group: group.to_string(),
            source: source.to_string(),
            cancel: cancel.clone(),
            state: state_tx,
        };
        info!(group, source, "starting remote tail");
        let handle = tokio::spawn(task.run());

        groups.insert(
            group.to_string(),
            GroupTail {
                cancel,
                handle: Some(handle),
                state: state_rx.clone(),
            },
        );
        state_rx
    }

    /// Cancel the task for `group` and wait for it to finish. Returns false
    /// when nothing was running.
    pub async fn stop(&self, group: &str) -> bool {
        let mut groups = self.groups.lock().await;
        let Some(tail) = groups.get_mut(group) else {
            return false;
        };
        let Some(handle) = tail.handle.take() else {
            return false;
        };
        tail.cancel.cancel();
        join(group, handle).await;
        true
    }

    pub async fn stop_all(&self) {
        let mut groups = self.groups.lock().await;
        for (group, tail) in groups.iter_mut() {
            tail.cancel.cancel();
            if let Some(handle) = tail.handle.take() {
                join(group, handle).await;
            }
        }
    }

    pub async fn state(&self, group: &str) -> TailState {
        self.groups
            .lock()
            .await
            .get(group)
            .map(|tail| *tail.state.borrow())
            .unwrap_or(TailState::Idle)
    }

    /// Groups with a task that has not stopped.
    pub async fn active_groups(&self) -> Vec<String> {
        let groups = self.groups.lock().await;
        let mut active: Vec<String> = groups
            .iter()
            .filter(|(_, tail)| tail.handle.is_some() && *tail.state.borrow() != TailState::Stopped)
            .map(|(group, _)| group.clone())
            .collect();
        active.sort();
        active
    }
}

async fn shut_down(group: &str, mut tail: GroupTail) {
    tail.cancel.cancel();
    if let Some(handle) = tail.handle.take() {
        join(group, handle).await;
    }
}

async fn join(group: &str, handle: JoinHandle<()>) {
    if let Err(err) = handle.await {
        if err.is_panic() {
            error!(group, error = %err, "tail task panicked");
        }
    }
    debug!(group, "tail task finished");
}

/// Read position within one stream.
#[derive(Debug)]
struct StreamCursor {
    stream: String,
    token: Option<PaginationToken>,
    since: DateTime<Utc>,
}

impl StreamCursor {
    /// Move `since` past the newest event in `events`.
    fn advance(&mut self, events: &[RemoteEvent]) {
        if let Some(newest) = events.iter().filter_map(|e| e.timestamp_ms).max() {
            if let Some(next) = Utc.timestamp_millis_opt(newest.saturating_add(1)).single() {
                self.since = self.since.max(next);
            }
        }
    }
}

struct TailTask {
    fetcher: Arc<dyn RemoteLogFetcher>,
    pipeline: Arc<LogPipeline>,
    settings: TailSettings,
    group: String,
    source: String,
    cancel: CancellationToken,
    state: watch::Sender<TailState>,
}

impl TailTask {
    async fn run(self) {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        tokio::join!(self.produce(tx), self.consume(rx));
        self.state.send_replace(TailState::Stopped);
        debug!(group = %self.group, "tail task stopped");
    }

    async fn consume(&self, mut rx: mpsc::Receiver<LogEntry>) {
        loop {
            let entry = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                entry = rx.recv() => match entry {
                    Some(entry) => entry,
                    None => break,
                },
            };
            if self.cancel.is_cancelled() {
                break;
            }
            self.pipeline.ingest(&self.source, entry);
        }
    }

    /// Queue an entry for the consumer. False once the task is cancelled.
    async fn send(&self, tx: &mpsc::Sender<LogEntry>, entry: LogEntry) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = tx.send(entry) => sent.is_ok(),
        }
    }

    async fn send_events(&self, tx: &mpsc::Sender<LogEntry>, stream: &str, events: Vec<RemoteEvent>) -> bool {
        for event in events {
            if !self.send(tx, event.into_entry(&self.source, &self.group, stream)).await {
                return false;
            }
        }
        true
    }

    fn status(&self, tone: StatusTone, message: String) {
        if !self.cancel.is_cancelled() {
            self.pipeline.set_status(tone, message);
        }
    }

    async fn produce(&self, tx: mpsc::Sender<LogEntry>) {
        let Some(cursors) = self.load(&tx).await else {
            return;
        };
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_replace(TailState::Tailing);
        self.tail(&tx, cursors).await;
    }

    /// Initial batch. `None` when there is nothing to tail.
    async fn load(&self, tx: &mpsc::Sender<LogEntry>) -> Option<Vec<StreamCursor>> {
        let group = self.group.as_str();
        let started = Utc::now();
        self.state.send_replace(TailState::Loading);
        self.status(StatusTone::Info, format!("Loading remote logs from {group}..."));

        let listed = bounded(
            &self.cancel,
            Some(self.settings.request_timeout),
            self.fetcher.list_streams(group, self.settings.stream_limit),
        )
        .await;
        let streams = match listed {
            Ok(streams) => streams,
            Err(err) if err.is_cancelled() => {
                debug!(group, "loading cancelled");
                return None;
            }
            Err(err) => {
                let err = err.in_group(group);
                error!(group, error = %err, "failed to list log streams");
                self.status(StatusTone::Error, format!("Failed to get log streams: {err}"));
                return None;
            }
        };

        if streams.is_empty() {
            info!(group, "no log streams found");
            self.status(StatusTone::Warn, format!("No log streams found in {group}"));
            return None;
        }

        let mut cursors = Vec::with_capacity(streams.len());
        let mut loaded = 0usize;
        for descriptor in &streams {
            let stream = descriptor.name.as_str();
            let mut cursor = StreamCursor {
                stream: stream.to_string(),
                token: None,
                since: started,
            };

            let fetched = bounded(
                &self.cancel,
                Some(self.settings.request_timeout),
                self.fetcher.get_events(group, stream, self.settings.initial_events, false),
            )
            .await;
            match fetched {
                Ok(page) => {
                    cursor.token = page.next_token;
                    cursor.advance(&page.events);
                    loaded += page.events.len();
                    if !self.send_events(tx, stream, page.events).await {
                        return None;
                    }
                }
                Err(err) if err.is_cancelled() => return None,
                Err(err) => {
                    warn!(group, stream, error = %err.in_stream(group, stream), "skipping stream");
                }
            }
            cursors.push(cursor);
        }

        info!(group, loaded, streams = streams.len(), "initial load complete");
        self.status(
            StatusTone::Ok,
            format!("Loaded {loaded} remote log entries from {} streams", streams.len()),
        );
        Some(cursors)
    }

    async fn tail(&self, tx: &mpsc::Sender<LogEntry>, mut cursors: Vec<StreamCursor>) {
        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            for cursor in cursors.iter_mut() {
                match self.poll(cursor).await {
                    Ok(events) if events.is_empty() => {}
                    Ok(events) => {
                        debug!(group = %self.group, stream = %cursor.stream, count = events.len(), "new events");
                        if !self.send_events(tx, &cursor.stream, events).await {
                            return;
                        }
                    }
                    Err(err) if err.is_cancelled() => return,
                    Err(err) => {
                        let err = err.in_stream(&self.group, &cursor.stream);
                        warn!(error = %err, "tail poll failed");
                        self.status(StatusTone::Warn, format!("Tailing error: {err}"));
                    }
                }
            }
        }
    }

    /// Fetch what is new in one stream and move its cursor forward.
    async fn poll(&self, cursor: &mut StreamCursor) -> Result<Vec<RemoteEvent>, FetchError> {
        let group = self.group.as_str();
        let limit = self.settings.poll_batch;
        let events = match &cursor.token {
            Some(token) => {
                let page = bounded(
                    &self.cancel,
                    None,
                    self.fetcher.get_events_by_token(group, &cursor.stream, token, limit),
                )
                .await?;
                cursor.token = page.next_token;
                page.events
            }
            None => {
                bounded(
                    &self.cancel,
                    None,
                    self.fetcher.get_events_since(group, &cursor.stream, cursor.since, limit),
                )
                .await?
            }
        };
        cursor.advance(&events);
        Ok(events)
    }
}
