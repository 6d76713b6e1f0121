pub mod build;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod corpus;
pub mod error;
pub mod remote;
pub mod search;
pub mod tracing;
pub mod types;

pub use build::{ArtifactSet, BuildReport, build_artifacts, run_build};
pub use cache::{FetchCache, RequestStatus};
pub use client::{ClientOptions, SearchClient};
pub use config::{Config, EmptyRemotePolicy};
pub use error::{CorpusError, RemoteError, Result, SearchError};
pub use remote::{HttpSearchBackend, NoRemote, SearchBackend};
pub use search::FuzzyEngine;
pub use types::{
    Field, ResultSource, SearchDocument, SearchQuery, SearchResponse, SearchResult,
};
