//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for mansearch operations.
///
/// Defaults to `anyhow::Error`, with context added via `.context()` and
/// `.with_context()` methods throughout the codebase. Typed tiers name their
/// error explicitly, as in `Result<SearchResponse, RemoteError>`.
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Error returned when a single corpus record cannot be loaded.
///
/// These never abort a build; the builder logs them and records them in the report.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// The file could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is not a valid command record.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The record parsed but has no usable name.
    #[error("record at {} has an empty name", path.display())]
    MissingName { path: PathBuf },
}

impl CorpusError {
    /// Path of the offending file.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::MissingName { path } => path,
        }
    }
}

/// Failure of the remote search tier.
///
/// `Clone` because a single failure is handed to every caller sharing an
/// in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// No remote endpoint configured; the local tier is the only source.
    #[error("no remote search endpoint configured")]
    NotConfigured,
    /// Connection, DNS, timeout or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("remote returned HTTP {0}")]
    Status(u16),
    /// The body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
    /// The request was aborted by `cancel_pending`.
    #[error("request cancelled")]
    Cancelled,
}

/// Error surfaced by the search client.
///
/// Remote and fallback failures are recovered internally; only caller-initiated
/// cancellation reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("search cancelled before it completed")]
    Cancelled,
}
