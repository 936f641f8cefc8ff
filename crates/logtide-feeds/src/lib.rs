//! logtide-feeds — the sources that put entries into a [`LogPipeline`].
//!
//! - [`remote`]: the [`RemoteLogFetcher`] seam for paginated remote log
//!   backends, plus event conversion and the cancellable call wrapper.
//! - [`tail`]: the [`TailScheduler`] that loads and then polls remote groups.
//! - [`local`]: the synthetic in-process application source.
//!
//! [`LogPipeline`]: logtide_core::LogPipeline

pub mod local;
pub mod remote;
pub mod tail;

pub use remote::{EventPage, PaginationToken, RemoteEvent, RemoteLogFetcher, StreamDescriptor};
pub use tail::{TailScheduler, TailSettings, TailState};
