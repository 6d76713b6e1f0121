//! Remote search tier.
//!
//! [`SearchBackend`] is the seam between the search client and whatever serves
//! `/api/search`. The HTTP implementation tags every call with a monotonic
//! request id and times it; tests substitute in-process stubs.

use crate::config::RemoteConfig;
use crate::error::{RemoteError, Result};
use crate::types::{SearchQuery, SearchResponse};
use anyhow::Context;
use futures::future::BoxFuture;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const SEARCH_PATH: &str = "/api/search";
pub const SUGGESTIONS_PATH: &str = "/api/search/suggestions";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A source of remote search results.
///
/// Returned futures are `'static` so one call can be shared between several
/// waiting callers.
pub trait SearchBackend: Send + Sync {
    fn search(&self, query: &SearchQuery) -> BoxFuture<'static, Result<SearchResponse, RemoteError>>;

    fn suggestions(
        &self,
        prefix: &str,
        limit: usize,
    ) -> BoxFuture<'static, Result<Vec<String>, RemoteError>>;
}

/// Backend used when no endpoint is configured: every call fails immediately,
/// leaving the local tier to answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl SearchBackend for NoRemote {
    fn search(&self, _query: &SearchQuery) -> BoxFuture<'static, Result<SearchResponse, RemoteError>> {
        Box::pin(async { Err(RemoteError::NotConfigured) })
    }

    fn suggestions(
        &self,
        _prefix: &str,
        _limit: usize,
    ) -> BoxFuture<'static, Result<Vec<String>, RemoteError>> {
        Box::pin(async { Err(RemoteError::NotConfigured) })
    }
}

/// `reqwest`-backed client for the documentation site's search API.
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: Url,
    next_request_id: Arc<AtomicU64>,
    slow_request: Duration,
}

impl HttpSearchBackend {
    pub fn new(base_url: &str, config: &RemoteConfig) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid remote base URL '{}'", base_url))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            next_request_id: Arc::new(AtomicU64::new(1)),
            slow_request: config.slow_request(),
        })
    }

    /// Absolute URL for `path` with `params` as the query string.
    pub fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, RemoteError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| RemoteError::Transport(format!("bad endpoint {}: {}", path, e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("q", query.query.clone())];
        if let Some(section) = query.section {
            params.push(("section", section.to_string()));
        }
        params.push(("limit", query.limit.to_string()));
        params.push(("fuzzy", query.fuzzy.to_string()));
        params.push(("threshold", query.threshold.to_string()));
        params
    }

    fn request<T>(&self, url: Url) -> BoxFuture<'static, Result<T, RemoteError>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let slow_request = self.slow_request;

        Box::pin(async move {
            let start = tokio::time::Instant::now();
            let result = get_json(&client, url.clone(), request_id).await;

            let elapsed = start.elapsed();
            if elapsed > slow_request {
                tracing::warn!(
                    "Slow request #{} to {} took {:?}",
                    request_id,
                    url.path(),
                    elapsed
                );
            } else {
                tracing::debug!("Request #{} to {} took {:?}", request_id, url.path(), elapsed);
            }
            result
        })
    }
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
    request_id: u64,
) -> Result<T, RemoteError> {
    let response = client
        .get(url)
        .header(REQUEST_ID_HEADER, request_id.to_string())
        .send()
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

/// Keeps only the string entries of a suggestions payload.
///
/// Anything other than a JSON array is malformed.
pub(crate) fn parse_suggestions(payload: serde_json::Value) -> Result<Vec<String>, RemoteError> {
    match payload {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        other => Err(RemoteError::Decode(format!(
            "expected an array of suggestions, got {}",
            json_kind(&other)
        ))),
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl SearchBackend for HttpSearchBackend {
    fn search(&self, query: &SearchQuery) -> BoxFuture<'static, Result<SearchResponse, RemoteError>> {
        let url = match self.endpoint(SEARCH_PATH, &Self::search_params(query)) {
            Ok(url) => url,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        self.request::<SearchResponse>(url)
    }

    fn suggestions(
        &self,
        prefix: &str,
        limit: usize,
    ) -> BoxFuture<'static, Result<Vec<String>, RemoteError>> {
        let params = [("prefix", prefix.to_string()), ("limit", limit.to_string())];
        let url = match self.endpoint(SUGGESTIONS_PATH, &params) {
            Ok(url) => url,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let request = self.request::<serde_json::Value>(url);

        Box::pin(async move { parse_suggestions(request.await?) })
    }
}
