//! logtide-core — shared types and pipeline layers for logtide.
//!
//! This crate owns everything that does not depend on a particular log
//! backend: the bounded per-source [`store`], the static source
//! [`registry`], the asynchronous full-text [`search`] index, [`view`]
//! building, file [`export`], and the [`pipeline`] that ties them together.
//!
//! # Architecture
//!
//! ```text
//! feeds ──► Pipeline ──► Store ──► View ──► Presenter
//!              │                     ▲
//!              └──► Search index ────┘
//! ```
//!
//! Background tasks append through [`pipeline::LogPipeline`]; the Presenter
//! reads snapshots and never touches the store's locks directly.

pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod registry;
pub mod search;
pub mod store;
pub mod types;
pub mod view;

pub use error::{ConfigurationError, ExportError, FetchError, IndexError};
pub use pipeline::{LogPipeline, Status, StatusTone};
pub use store::LogStore;
pub use types::{EntryKey, LogEntry, LogLevel, SourceKind, Span};
