//! Error taxonomy.
//!
//! Each class maps to one handling policy:
//!
//! | Error | Policy |
//! |-------|--------|
//! | [`ConfigurationError`] | status message, operation aborted, no retry |
//! | [`FetchError`] | logged with group/stream context, stream skipped |
//! | [`IndexError`] | logged, entry stays visible through the plain filter |
//! | [`ExportError`] | returned to the caller |

use std::path::PathBuf;
use std::time::Duration;

/// A remote source was selected but cannot be activated.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no remote log client available for source {source_name}")]
    NoRemoteClient { source_name: String },
    #[error("no active log group for source {source_name}")]
    NoActiveGroup { source_name: String },
}

/// A remote list/get call failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Backend(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The caller's cancellation token fired. Never surfaced to the user.
    #[error("request cancelled")]
    Cancelled,
    #[error("log group {group}: {source}")]
    Group {
        group: String,
        #[source]
        source: Box<FetchError>,
    },
    #[error("log group {group}, stream {stream}: {source}")]
    Stream {
        group: String,
        stream: String,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    pub fn backend(message: impl Into<String>) -> Self {
        FetchError::Backend(message.into())
    }

    /// Annotate with the log group the call was made against.
    pub fn in_group(self, group: &str) -> Self {
        FetchError::Group {
            group: group.to_string(),
            source: Box::new(self),
        }
    }

    /// Annotate with the (group, stream) the call was made against.
    pub fn in_stream(self, group: &str, stream: &str) -> Self {
        FetchError::Stream {
            group: group.to_string(),
            stream: stream.to_string(),
            source: Box::new(self),
        }
    }

    /// True when this error (or the error it wraps) is a deliberate stop.
    pub fn is_cancelled(&self) -> bool {
        match self {
            FetchError::Cancelled => true,
            FetchError::Group { source, .. } | FetchError::Stream { source, .. } => {
                source.is_cancelled()
            }
            _ => false,
        }
    }
}

/// Indexing or index query failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("search index is not running")]
    Unavailable,
    #[error("invalid query: {0}")]
    Query(String),
}

/// Writing an export file failed.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no source selected")]
    NoSource,
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
