//! Logs controller — the command surface a presenter drives.
//!
//! The controller owns the presenter-side state (selected source, filter
//! text, auto-scroll, active remote group) and turns commands into pipeline
//! and tail-scheduler calls. Presenters render [`LogsController::view`] and
//! [`LogsController::status`] whenever the receiver from
//! [`LogsController::subscribe`] changes.

use logtide_core::export;
use logtide_core::registry::{LogSource, Resolution, SourceRegistry, APP_SOURCE, REMOTE_SOURCE};
use logtide_core::search::Query;
use logtide_core::view::LogView;
use logtide_core::{ConfigurationError, ExportError, LogEntry, LogLevel, LogPipeline, Status, StatusTone};
use logtide_feeds::{local, RemoteLogFetcher, TailScheduler, TailSettings, TailState};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct LogsController {
    pipeline: Arc<LogPipeline>,
    registry: SourceRegistry,
    settings: TailSettings,
    scheduler: Option<TailScheduler>,
    selected: Option<&'static str>,
    filter: String,
    auto_scroll: bool,
    group: Option<String>,
}

impl LogsController {
    pub fn new(pipeline: Arc<LogPipeline>, settings: TailSettings) -> Self {
        let registry = SourceRegistry::default();
        let selected = registry.first_enabled().map(|s| s.name());
        Self {
            pipeline,
            registry,
            settings,
            scheduler: None,
            selected,
            filter: String::new(),
            auto_scroll: true,
            group: None,
        }
    }

    /// Seed the application source with its startup entries.
    pub fn seed_local_source(&self) {
        local::seed(&self.pipeline, self.registry.sources().len());
    }

    pub fn pipeline(&self) -> &Arc<LogPipeline> {
        &self.pipeline
    }

    // -- remote client availability ----------------------------------------

    /// Attach or detach the remote log client. Detaching stops any tail.
    pub async fn set_remote_client(&mut self, client: Option<Arc<dyn RemoteLogFetcher>>) {
        if let Some(previous) = self.scheduler.take() {
            previous.stop_all().await;
        }
        let available = client.is_some();
        self.scheduler = client.map(|c| TailScheduler::new(c, self.pipeline.clone(), self.settings.clone()));
        if self.registry.set_remote_available(available) {
            info!(available, "remote log client availability changed");
        }
        self.pipeline.notify();
    }

    /// Activation signal: show `group` in the remote source.
    pub async fn show_remote_group(&mut self, group: &str, origin: &str) -> Result<(), ConfigurationError> {
        if self.scheduler.is_none() {
            return Err(self.misconfigured(ConfigurationError::NoRemoteClient {
                source_name: REMOTE_SOURCE.to_string(),
            }));
        }
        self.pipeline
            .set_status(StatusTone::Info, format!("{origin} - log group: {group}"));
        self.group = Some(group.to_string());
        self.selected = Some(REMOTE_SOURCE);
        self.reload_remote().await
    }

    pub fn remote_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub async fn tail_state(&self) -> TailState {
        match (&self.scheduler, &self.group) {
            (Some(scheduler), Some(group)) => scheduler.state(group).await,
            _ => TailState::Idle,
        }
    }

    fn misconfigured(&self, err: ConfigurationError) -> ConfigurationError {
        self.pipeline.set_status(StatusTone::Error, err.to_string());
        err
    }

    /// Stop, clear and restart the tail for the active group.
    async fn reload_remote(&mut self) -> Result<(), ConfigurationError> {
        let Some(scheduler) = &self.scheduler else {
            return Err(self.misconfigured(ConfigurationError::NoRemoteClient {
                source_name: REMOTE_SOURCE.to_string(),
            }));
        };
        let Some(group) = self.group.clone() else {
            return Err(self.misconfigured(ConfigurationError::NoActiveGroup {
                source_name: REMOTE_SOURCE.to_string(),
            }));
        };
        scheduler.stop_all().await;
        self.pipeline.clear(REMOTE_SOURCE);
        scheduler.start(&group, REMOTE_SOURCE).await;
        Ok(())
    }

    async fn stop_remote(&self) {
        if let (Some(scheduler), Some(group)) = (&self.scheduler, &self.group) {
            if scheduler.stop(group).await {
                debug!(group = %group, "remote tail stopped on deselection");
            }
        }
    }

    // -- presenter commands -------------------------------------------------

    pub fn sources(&self) -> Vec<LogSource> {
        self.registry.sources()
    }

    pub fn selected(&self) -> Option<LogSource> {
        self.selected.and_then(|name| self.registry.get(name))
    }

    /// Select a catalog source. Disabled and unknown sources are ignored.
    pub async fn select_source(&mut self, name: &str) -> Result<(), ConfigurationError> {
        match self.registry.resolve(name) {
            Resolution::Ignored => {
                debug!(source = name, "ignoring selection of unavailable source");
                Ok(())
            }
            Resolution::Local(source) => {
                if self.selected == Some(REMOTE_SOURCE) {
                    self.stop_remote().await;
                }
                self.selected = Some(source);
                self.describe_selection();
                Ok(())
            }
            Resolution::Remote(source) => {
                let running = matches!(self.tail_state().await, TailState::Loading | TailState::Tailing);
                self.selected = Some(source);
                if running {
                    self.describe_selection();
                    Ok(())
                } else {
                    self.reload_remote().await
                }
            }
        }
    }

    fn describe_selection(&self) {
        if let Some(source) = self.selected() {
            self.pipeline.set_status(StatusTone::Info, source.describe());
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Replace the filter. Malformed structured queries are reported on the
    /// status line; the view then uses the plain substring filter.
    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        debug!(filter = text, "filter changed");
        if let Err(err) = Query::parse(text) {
            self.pipeline.set_status(StatusTone::Warn, format!("Search error: {err}"));
        }
        self.pipeline.notify();
    }

    /// Re-read the selected source.
    pub async fn refresh(&mut self) -> Result<(), ConfigurationError> {
        match self.selected {
            Some(APP_SOURCE) => {
                local::refresh(&self.pipeline);
                self.pipeline.set_status(StatusTone::Ok, "Logs refreshed");
                Ok(())
            }
            Some(REMOTE_SOURCE) => self.reload_remote().await,
            _ => Ok(()),
        }
    }

    /// Drop every buffered entry of the selected source.
    pub fn clear(&mut self) {
        if let Some(source) = self.selected {
            self.pipeline.clear(source);
            self.pipeline.set_status(StatusTone::Info, "Logs cleared");
        }
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.auto_scroll = !self.auto_scroll;
        let state = if self.auto_scroll { "ON" } else { "OFF" };
        self.pipeline.set_status(StatusTone::Info, format!("Auto-scroll: {state}"));
        self.auto_scroll
    }

    /// Write the selected source, in insertion order, to `path`.
    pub fn export_to_file(&self, path: &Path) -> Result<usize, ExportError> {
        let source = self.selected.ok_or(ExportError::NoSource)?;
        let entries = self.pipeline.store().get_all(source);
        match export::export_to_file(path, &entries) {
            Ok(lines) => {
                self.pipeline.set_status(
                    StatusTone::Ok,
                    format!("Exported {lines} entries to {}", path.display()),
                );
                Ok(lines)
            }
            Err(err) => {
                self.pipeline.set_status(StatusTone::Error, format!("Export failed: {err}"));
                Err(err)
            }
        }
    }

    pub fn add_application_log<I>(&self, level: LogLevel, message: &str, fields: I) -> Arc<LogEntry>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        local::add_application_log(&self.pipeline, level, message, fields)
    }

    // -- rendering inputs ---------------------------------------------------

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.pipeline.subscribe()
    }

    pub fn view(&self) -> LogView {
        let Some(source) = self.selected else {
            return LogView::default();
        };
        self.pipeline.view(source, &self.filter).view
    }

    /// Title with the count annotation, e.g. `Application Logs (1 of 5)`.
    pub fn title(&self, view: &LogView) -> String {
        let name = self.selected().map(|s| s.display_name()).unwrap_or("Logs");
        format!("{name} {}", view.count_annotation())
    }

    pub fn status(&self) -> Status {
        self.pipeline.status()
    }

    pub async fn shutdown(&mut self) {
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop_all().await;
        }
        self.pipeline.shutdown();
        info!("controller shut down");
    }
}
