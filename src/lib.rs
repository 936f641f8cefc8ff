//! logtide — multi-source log viewing with remote tailing and live search.
//!
//! The workspace splits into three layers, re-exported here so integration
//! tests and benches can reach them through one crate:
//!
//! ```text
//! feeds ──► Pipeline ──► Store / search index ──► console
//! ```
//!
//! - [`logtide_core`]: entries, the bounded store, the search index, views, export.
//! - [`logtide_feeds`]: the local application source and remote tailing.
//! - [`logtide_console`]: the controller and the line-oriented presenter.

pub use logtide_console;
pub use logtide_core;
pub use logtide_feeds;
