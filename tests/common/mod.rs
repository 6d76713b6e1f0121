//! Shared test fixtures and utilities for integration tests.
//!
//! # Test Isolation Strategy
//!
//! Every test gets its own corpus directory and its own artifact directory in
//! a fresh temp dir, plus its own `FetchCache`. Nothing is shared between tests.
//!
//! # Available Fixtures
//!
//! - `corpus`: a small corpus of command records (ls, lsblk, cp, git, github, tar)
//! - `built_corpus`: the same corpus with artifacts already built
//!
//! # Stub Backends
//!
//! [`StubBackend`] stands in for the remote tier: it answers with a fixed
//! result, counts calls, and can delay or block so dedup and cancellation are
//! observable.

use futures::future::BoxFuture;
use mansearch::{
    ClientOptions, FetchCache, FuzzyEngine, RemoteError, SearchBackend, SearchClient,
    SearchQuery, SearchResponse, run_build,
};
use rstest::fixture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Notify;

/// A temporary workspace directory for test isolation.
///
/// Cleaned up when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file with the given content, creating parent directories.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: &str) {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
    }

    /// Reads a file back as bytes.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read_file(&self, path: &str) -> Vec<u8> {
        std::fs::read(self.root.join(path))
            .unwrap_or_else(|e| panic!("Failed to read file '{}': {}", path, e))
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// A corpus directory at `corpus/` and an artifact directory at `dist/`.
#[allow(dead_code)]
pub struct CorpusWorkspace {
    pub workspace: TempWorkspace,
}

#[allow(dead_code)]
impl CorpusWorkspace {
    pub fn new() -> Self {
        mansearch::tracing::init();
        Self {
            workspace: TempWorkspace::new(),
        }
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.workspace.path().join("corpus")
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.workspace.path().join("dist")
    }

    /// Writes one command record to `corpus/<file>`.
    pub fn add_record(&self, file: &str, record: &serde_json::Value) {
        let content = serde_json::to_string_pretty(record).expect("Failed to serialize record");
        self.workspace.create_file(&format!("corpus/{}", file), &content);
    }

    /// Writes a raw (possibly broken) file to `corpus/<file>`.
    pub fn add_raw(&self, file: &str, content: &str) {
        self.workspace.create_file(&format!("corpus/{}", file), content);
    }

    pub fn artifact(&self, name: &str) -> Vec<u8> {
        self.workspace.read_file(&format!("dist/{}", name))
    }

    pub async fn build(&self) -> mansearch::BuildReport {
        run_build(&self.corpus_dir(), &self.artifact_dir())
            .await
            .expect("Build should succeed")
    }

    pub async fn engine(&self) -> Arc<FuzzyEngine> {
        let engine = FuzzyEngine::load(&self.artifact_dir(), mansearch::Config::default().fuzzy)
            .await
            .expect("Artifacts should load");
        Arc::new(engine)
    }

    /// A client over the built artifacts, with `backend` as the remote tier.
    pub async fn client(&self, backend: Arc<dyn SearchBackend>) -> SearchClient {
        SearchClient::with_engine(
            backend,
            Arc::new(FetchCache::default()),
            self.engine().await,
            ClientOptions::default(),
        )
    }
}

impl Default for CorpusWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard test corpus, not yet built.
#[fixture]
pub fn corpus() -> CorpusWorkspace {
    let corpus = CorpusWorkspace::new();
    corpus.add_record(
        "ls.json",
        &serde_json::json!({
            "name": "ls",
            "section": 1,
            "title": "list directory contents",
            "description": "List information about the FILEs (the current directory by default).",
            "category": "file-management",
            "examples": ["ls -la", {"command": "ls -lh", "description": "human readable sizes"}],
            "relatedCommands": ["dir", "tree"],
            "isCommon": true
        }),
    );
    corpus.add_record(
        "lsblk.json",
        &serde_json::json!({
            "name": "lsblk",
            "section": 8,
            "title": "list block devices",
            "description": "lsblk lists information about all available block devices.",
            "category": "system",
        }),
    );
    corpus.add_record(
        "cp.json",
        &serde_json::json!({
            "name": "cp",
            "section": 1,
            "title": "copy files and directories",
            "description": "Copy SOURCE to DEST, or multiple SOURCEs to DIRECTORY.",
            "category": "file-management",
            "isCommon": true
        }),
    );
    corpus.add_record(
        "git.json",
        &serde_json::json!({
            "name": "git",
            "section": 1,
            "title": "the stupid content tracker",
            "description": "Git is a fast, scalable, distributed revision control system.",
            "category": "version-control",
            "seeAlso": ["git-log", "git-commit"],
            "isCommon": true
        }),
    );
    corpus.add_record(
        "github.json",
        &serde_json::json!({
            "name": "github",
            "section": 1,
            "title": "work with GitHub from the command line",
            "description": "Work seamlessly with GitHub from the command line.",
            "category": "version-control"
        }),
    );
    corpus.add_record(
        "tar.json",
        &serde_json::json!({
            "name": "tar",
            "section": 1,
            "title": "an archiving utility",
            "description": "GNU tar saves many files together into a single tape or disk archive.",
            "category": "archive",
            "synopsis": "tar [OPTION...] [FILE]...",
            "options": [{"flag": "-x", "description": "extract files from an archive"}],
            "isCommon": true
        }),
    );
    corpus
}

/// The standard corpus with artifacts built into `dist/`.
#[fixture]
pub async fn built_corpus(corpus: CorpusWorkspace) -> CorpusWorkspace {
    corpus.build().await;
    corpus
}

/// How a [`StubBackend`] answers searches.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum StubReply {
    Respond(SearchResponse),
    Fail(RemoteError),
    /// Never answers; only cancellation ends the call.
    Hang,
    /// Hangs on the first call, then answers with the inner reply.
    HangOnce(Box<StubReply>),
}

/// In-process remote tier.
#[allow(dead_code)]
pub struct StubBackend {
    reply: StubReply,
    suggestions: Result<Vec<String>, RemoteError>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    called: Arc<Notify>,
}

#[allow(dead_code)]
impl StubBackend {
    pub fn new(reply: StubReply) -> Self {
        Self {
            reply,
            suggestions: Err(RemoteError::Status(503)),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            called: Arc::new(Notify::new()),
        }
    }

    /// Always fails with a transport error.
    pub fn failing() -> Self {
        Self::new(StubReply::Fail(RemoteError::Transport(
            "connection refused".into(),
        )))
    }

    /// Always answers `{ results: [], total: 0 }`.
    pub fn empty() -> Self {
        Self::new(StubReply::Respond(SearchResponse::empty()))
    }

    pub fn hanging() -> Self {
        Self::new(StubReply::Hang)
    }

    /// Hangs once, then fails like [`StubBackend::failing`].
    pub fn hanging_once() -> Self {
        Self::new(StubReply::HangOnce(Box::new(StubReply::Fail(
            RemoteError::Transport("connection refused".into()),
        ))))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Result<Vec<String>, RemoteError>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Counter of search calls, shared with the backend.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Signalled whenever a search call starts.
    pub fn called(&self) -> Arc<Notify> {
        Arc::clone(&self.called)
    }
}

impl SearchBackend for StubBackend {
    fn search(&self, _query: &SearchQuery) -> BoxFuture<'static, Result<SearchResponse, RemoteError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();

        let reply = match &self.reply {
            StubReply::HangOnce(_) if call == 0 => StubReply::Hang,
            StubReply::HangOnce(then) => (**then).clone(),
            other => other.clone(),
        };
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match reply {
                StubReply::Respond(response) => Ok(response),
                StubReply::Fail(e) => Err(e),
                StubReply::Hang | StubReply::HangOnce(_) => futures::future::pending().await,
            }
        })
    }

    fn suggestions(
        &self,
        _prefix: &str,
        _limit: usize,
    ) -> BoxFuture<'static, Result<Vec<String>, RemoteError>> {
        let result = self.suggestions.clone();
        Box::pin(async move { result })
    }
}
