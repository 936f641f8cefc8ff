//! Configuration types for logtide.
//!
//! [`Config::load`] reads `~/.config/logtide/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist, then applies `LOGTIDE_`
//! environment overrides (`LOGTIDE_STORE__MAX_LINES=500`).
//! [`Config::defaults`] returns the same defaults without touching the
//! filesystem or environment (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[store]
max_lines = 1000

[tail]
stream_limit         = 10
initial_events       = 10
poll_interval_ms     = 2000
poll_batch           = 50
request_timeout_secs = 30
channel_capacity     = 100

[search]
enabled       = true
result_limit  = 1000
message_boost = 1.5

[logging]
level = "info"
file  = "logtide.log"
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tail: TailConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Per-source retention; older entries are evicted first.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

fn default_max_lines() -> usize { 1000 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_lines: default_max_lines() }
    }
}

/// `[tail]` section — remote loading and polling.
#[derive(Debug, Clone, Deserialize)]
pub struct TailConfig {
    /// Most recently active streams loaded per group.
    #[serde(default = "default_stream_limit")]
    pub stream_limit: usize,
    /// Events fetched from the tail of each stream during loading.
    #[serde(default = "default_initial_events")]
    pub initial_events: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Events requested per stream per poll tick.
    #[serde(default = "default_poll_batch")]
    pub poll_batch: usize,
    /// Bound on one-shot remote calls (loading). Tail polls are not bounded.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Capacity of the tail → pipeline channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_stream_limit() -> usize { 10 }
fn default_initial_events() -> usize { 10 }
fn default_poll_interval_ms() -> u64 { 2000 }
fn default_poll_batch() -> usize { 50 }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_channel_capacity() -> usize { 100 }

impl TailConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            stream_limit: default_stream_limit(),
            initial_events: default_initial_events(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_batch: default_poll_batch(),
            request_timeout_secs: default_request_timeout_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// When false, every filter uses the plain substring path.
    #[serde(default = "default_search_enabled")]
    pub enabled: bool,
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Weight of message matches relative to level/source for simple terms.
    #[serde(default = "default_message_boost")]
    pub message_boost: f32,
}

fn default_search_enabled() -> bool { true }
fn default_result_limit() -> usize { 1000 }
fn default_message_boost() -> f32 { 1.5 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: default_search_enabled(),
            result_limit: default_result_limit(),
            message_boost: default_message_boost(),
        }
    }
}

/// `[logging]` section — diagnostics for logtide itself.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_file() -> PathBuf { PathBuf::from("logtide.log") }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: default_log_file() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/logtide/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file layered over the defaults and the environment.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("LOGTIDE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store and tail scheduler cannot honour.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.store.max_lines > 0, "store.max_lines must be at least 1");
        anyhow::ensure!(self.tail.poll_interval_ms > 0, "tail.poll_interval_ms must be at least 1");
        Ok(())
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("logtide")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
