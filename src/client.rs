//! Search orchestration.
//!
//! [`SearchClient`] answers a query from, in order:
//! 1. the fetch cache
//! 2. the remote search endpoint
//! 3. the local fuzzy engine, when the remote failed or came back empty
//!
//! Identical concurrent queries share one run of this pipeline through the
//! cache's in-flight deduplication.

use crate::cache::FetchCache;
use crate::config::{Config, EmptyRemotePolicy};
use crate::error::{RemoteError, Result, SearchError};
use crate::remote::{HttpSearchBackend, NoRemote, SearchBackend};
use crate::search::{FuzzyEngine, build_highlights, prefix_relevance, relevance_from_distance};
use crate::types::{Field, ResultSource, SearchDocument, SearchQuery, SearchResponse, SearchResult};
use ahash::AHashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Tunables for [`SearchClient`], usually taken from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub empty_remote_policy: EmptyRemotePolicy,
    pub min_suggestion_len: usize,
    pub suggestion_threshold: f64,
    pub cache_ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ClientOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            empty_remote_policy: config.search.empty_remote_policy,
            min_suggestion_len: config.search.min_suggestion_len,
            suggestion_threshold: config.search.suggestion_threshold,
            cache_ttl: config.cache.ttl(),
        }
    }
}

/// Client-side search service.
///
/// All collaborators are injected; share one client behind an `Arc`.
pub struct SearchClient {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<FetchCache<SearchResponse>>,
    engine: RwLock<Option<Arc<FuzzyEngine>>>,
    /// Used for suggestions when no engine is loaded.
    documents: RwLock<Arc<Vec<SearchDocument>>>,
    options: ClientOptions,
    cancel: Mutex<CancellationToken>,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SearchClient {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<FetchCache<SearchResponse>>,
        options: ClientOptions,
    ) -> Self {
        Self {
            backend,
            cache,
            engine: RwLock::new(None),
            documents: RwLock::new(Arc::new(Vec::new())),
            options,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Like [`SearchClient::new`] with the local tier ready from the start.
    pub fn with_engine(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<FetchCache<SearchResponse>>,
        engine: Arc<FuzzyEngine>,
        options: ClientOptions,
    ) -> Self {
        let mut client = Self::new(backend, cache, options);
        client.engine = RwLock::new(Some(engine));
        client
    }

    /// Wires up the HTTP backend (or none) and a fresh cache from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn SearchBackend> = match &config.remote.base_url {
            Some(url) => Arc::new(HttpSearchBackend::new(url, &config.remote)?),
            None => {
                tracing::debug!("No remote endpoint configured, using the local tier only");
                Arc::new(NoRemote)
            }
        };
        let cache = Arc::new(FetchCache::new(&config.cache));
        Ok(Self::new(backend, cache, ClientOptions::from_config(config)))
    }

    /// Loads the fuzzy engine from an artifact directory and installs it.
    pub async fn load_engine(&self, dir: &Path, config: &Config) -> Result<()> {
        let engine = FuzzyEngine::load(dir, config.fuzzy.clone()).await?;
        self.set_engine(Arc::new(engine)).await;
        Ok(())
    }

    pub async fn set_engine(&self, engine: Arc<FuzzyEngine>) {
        *self.engine.write().await = Some(engine);
    }

    pub async fn engine(&self) -> Option<Arc<FuzzyEngine>> {
        self.engine.read().await.clone()
    }

    /// Sets the document list used for prefix suggestions without an engine.
    pub async fn set_documents(&self, documents: Vec<SearchDocument>) {
        *self.documents.write().await = Arc::new(documents);
    }

    pub fn cache(&self) -> &Arc<FetchCache<SearchResponse>> {
        &self.cache
    }

    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Runs a search through cache, remote and fuzzy tiers.
    ///
    /// Tier failures are absorbed: the worst outcome is an empty response.
    /// Only [`SearchClient::cancel_pending`] makes this return an error.
    pub async fn search(&self, query: SearchQuery) -> Result<SearchResponse, SearchError> {
        if query.query.is_empty() {
            return Ok(SearchResponse::empty());
        }

        let key = query.cache_key();
        let pipeline = Pipeline {
            backend: Arc::clone(&self.backend),
            engine: self.engine().await,
            policy: self.options.empty_remote_policy,
            token: self.cancel.lock().await.clone(),
        };

        let result = self
            .cache
            .fetch_with(&key, self.options.cache_ttl, move || {
                Box::pin(pipeline.resolve(query))
            })
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(RemoteError::Cancelled) => {
                tracing::debug!("Search {} cancelled", key);
                Err(SearchError::Cancelled)
            }
            Err(e) => {
                tracing::warn!("Search {} failed with no local fallback: {}", key, e);
                Ok(SearchResponse::empty())
            }
        }
    }

    /// Name suggestions for a partially typed command.
    ///
    /// Never fails; an unanswerable prefix gets an empty list.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = prefix.trim();
        if prefix.chars().count() < self.options.min_suggestion_len || limit == 0 {
            return Vec::new();
        }

        let token = self.cancel.lock().await.clone();
        let remote = self.backend.suggestions(prefix, limit);
        let remote = tokio::select! {
            biased;
            () = token.cancelled() => return Vec::new(),
            result = remote => result,
        };

        match remote {
            Ok(mut suggestions) if !suggestions.is_empty() => {
                suggestions.truncate(limit);
                return suggestions;
            }
            Ok(_) => tracing::debug!("Remote had no suggestions for '{}'", prefix),
            Err(e) => tracing::debug!("Remote suggestions for '{}' failed: {}", prefix, e),
        }

        if let Some(engine) = self.engine().await {
            let matches = engine.search_fields(
                prefix,
                &[Field::Name],
                None,
                Some(self.options.suggestion_threshold),
            );
            let candidates = matches.iter().filter_map(|found| engine.document(found.doc));
            return rank_suggestions(candidates, prefix, limit);
        }

        let documents = Arc::clone(&*self.documents.read().await);
        let lowered = prefix.to_lowercase();
        let candidates = documents
            .iter()
            .filter(|doc| doc.name.to_lowercase().starts_with(&lowered));
        rank_suggestions(candidates, prefix, limit)
    }

    /// Aborts every search in flight. Their callers get [`SearchError::Cancelled`].
    pub async fn cancel_pending(&self) {
        let mut token = self.cancel.lock().await;
        token.cancel();
        // Searches issued from here on must not join a cancelled run
        self.cache.clear_in_flight().await;
        *token = CancellationToken::new();
        tracing::debug!("Cancelled pending searches");
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Drops cached responses whose key contains `pattern`.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern).await
    }
}

/// Everything one search run needs, detached from the client so the run can
/// be shared between callers.
struct Pipeline {
    backend: Arc<dyn SearchBackend>,
    engine: Option<Arc<FuzzyEngine>>,
    policy: EmptyRemotePolicy,
    token: CancellationToken,
}

impl Pipeline {
    async fn resolve(self, query: SearchQuery) -> Result<SearchResponse, RemoteError> {
        let remote = self.backend.search(&query);
        let remote = tokio::select! {
            biased;
            () = self.token.cancelled() => return Err(RemoteError::Cancelled),
            result = remote => result,
        };

        match remote {
            Ok(mut response) if !response.results.is_empty() => {
                response.source = ResultSource::Remote;
                keep_section(&query, &mut response);
                Ok(response)
            }
            Ok(mut response) => match (&self.engine, self.policy) {
                (Some(engine), EmptyRemotePolicy::Fallback) if query.fuzzy => {
                    tracing::debug!("Remote had no results for '{}', trying fuzzy", query.query);
                    Ok(fuzzy_search(engine, &query))
                }
                _ => {
                    response.source = ResultSource::Remote;
                    Ok(response)
                }
            },
            Err(e) => match &self.engine {
                Some(engine) => {
                    tracing::warn!("Remote search failed ({}), using fuzzy fallback", e);
                    Ok(fuzzy_search(engine, &query))
                }
                None => Err(e),
            },
        }
    }
}

/// Drops results outside the requested section and clamps remote scores.
fn keep_section(query: &SearchQuery, response: &mut SearchResponse) {
    let before = response.results.len();
    response
        .results
        .retain(|result| query.accepts_section(result.document.section));
    for result in &mut response.results {
        result.score = result.score.clamp(0.0, 1.0);
    }
    if response.results.len() != before {
        response.total = response.results.len();
    }
}

/// Local tier: fuzzy match with headroom for the section filter, then rank.
fn fuzzy_search(engine: &FuzzyEngine, query: &SearchQuery) -> SearchResponse {
    let headroom = query.limit.saturating_mul(2);
    let mut results: Vec<SearchResult> = engine
        .search_with(&query.query, Some(headroom), Some(query.threshold))
        .into_iter()
        .filter_map(|found| {
            let document = engine.document(found.doc)?;
            query
                .accepts_section(document.section)
                .then(|| SearchResult {
                    document: document.clone(),
                    score: relevance_from_distance(found.distance),
                    highlights: build_highlights(document, &found.spans),
                })
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(query.limit);

    SearchResponse {
        total: results.len(),
        results,
        source: ResultSource::Fuzzy,
    }
}

/// Dedups by name and orders exact, prefix, substring, then fuzzy-only matches.
///
/// Common commands win ties; otherwise incoming order is kept.
fn rank_suggestions<'a>(
    candidates: impl Iterator<Item = &'a SearchDocument>,
    prefix: &str,
    limit: usize,
) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut ranked: Vec<(&SearchDocument, u32)> = candidates
        .filter(|&doc| seen.insert(doc.name.as_str()))
        .map(|doc| (doc, prefix_relevance(&doc.name, prefix).unwrap_or(0)))
        .collect();

    ranked.sort_by(|(a, a_rank), (b, b_rank)| {
        b_rank.cmp(a_rank).then(b.is_common.cmp(&a.is_common))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(doc, _)| doc.name.clone())
        .collect()
}
