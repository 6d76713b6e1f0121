//! In-memory fetch cache with TTL expiry and in-flight request deduplication.
//!
//! The cache is generic over the payload so any network call can sit behind
//! it. Two maps back it:
//! - completed payloads, each with its own TTL, expired lazily on read
//! - in-flight requests as shared futures, so concurrent callers for the same
//!   key await one request instead of issuing their own
//!
//! Each key's in-flight slot moves `Idle → Pending → Settled → Idle`. A pending
//! request older than the staleness window is treated as abandoned.

use crate::config::CacheConfig;
use crate::error::RemoteError;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Default entry lifetime: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// In-flight requests older than this are ignored.
pub const IN_FLIGHT_STALE_AFTER: Duration = Duration::from_secs(5);

const DEFAULT_CAPACITY: usize = 500;

/// A fetch that has not been shared yet.
pub type FetchFuture<V> = BoxFuture<'static, Result<V, RemoteError>>;

/// A fetch that several callers can await.
pub type SharedFetch<V> = Shared<FetchFuture<V>>;

/// Where a key's in-flight request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// No request, or only a stale one.
    Idle,
    Pending,
    /// Finished but not yet removed.
    Settled,
}

struct CacheEntry<V> {
    data: V,
    timestamp: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) > self.ttl
    }
}

struct QueuedRequest<V> {
    future: SharedFetch<V>,
    timestamp: Instant,
}

impl<V: Clone> QueuedRequest<V> {
    fn status(&self, now: Instant, stale_after: Duration) -> RequestStatus {
        if self.future.peek().is_some() {
            RequestStatus::Settled
        } else if now.saturating_duration_since(self.timestamp) > stale_after {
            RequestStatus::Idle
        } else {
            RequestStatus::Pending
        }
    }
}

/// Keyed response cache shared by every fetch site.
///
/// Construct one per process (or per test) and pass it around in an `Arc`.
pub struct FetchCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    in_flight: Mutex<HashMap<String, QueuedRequest<V>>>,
    default_ttl: Duration,
    stale_after: Duration,
}

impl<V> std::fmt::Debug for FetchCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("default_ttl", &self.default_ttl)
            .field("stale_after", &self.stale_after)
            .finish_non_exhaustive()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for FetchCache<V> {
    fn default() -> Self {
        Self::with_settings(DEFAULT_TTL, DEFAULT_CAPACITY, IN_FLIGHT_STALE_AFTER)
    }
}

impl<V: Clone + Send + Sync + 'static> FetchCache<V> {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_settings(config.ttl(), config.capacity, config.in_flight_stale())
    }

    pub fn with_settings(default_ttl: Duration, capacity: usize, stale_after: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            default_ttl,
            stale_after,
        }
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached payload if present and unexpired.
    ///
    /// An expired entry is removed as part of the read.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        match entries.get(key) {
            None => None,
            Some(entry) if !entry.is_expired(now) => Some(entry.data.clone()),
            Some(_) => {
                tracing::debug!("Cache entry expired for {}", key);
                entries.pop(key);
                None
            }
        }
    }

    /// Stores `data` under `key`, replacing any previous entry.
    pub async fn set(&self, key: &str, data: V, ttl: Duration) {
        let entry = CacheEntry {
            data,
            timestamp: Instant::now(),
            ttl,
        };
        if let Some((evicted, _)) = self.entries.lock().await.push(key.to_string(), entry)
            && evicted != key
        {
            tracing::debug!("Cache full, evicted {}", evicted);
        }
    }

    /// Stores `data` with the default TTL.
    pub async fn set_default(&self, key: &str, data: V) {
        self.set(key, data, self.default_ttl).await;
    }

    /// Removes every entry whose key contains `pattern`. Returns how many went.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.entries.lock().await;

        // Collect first: the map cannot be mutated while it is being iterated
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key);
        }

        tracing::debug!("Invalidated {} cache entries matching '{}'", doomed.len(), pattern);
        doomed.len()
    }

    /// Drops every cached payload and every in-flight record.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        self.in_flight.lock().await.clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns the pending request for `key`, if one is live.
    ///
    /// Stale or settled records are removed and reported as absent, so the
    /// caller issues a fresh request.
    pub async fn get_queued_request(&self, key: &str) -> Option<SharedFetch<V>> {
        let mut in_flight = self.in_flight.lock().await;
        live_request(&mut in_flight, key, self.stale_after)
    }

    /// Registers `future` as the in-flight request for `key` and returns the
    /// shared handle callers should await.
    pub async fn queue_request(&self, key: &str, future: FetchFuture<V>) -> SharedFetch<V> {
        let shared = future.shared();
        self.in_flight.lock().await.insert(
            key.to_string(),
            QueuedRequest {
                future: shared.clone(),
                timestamp: Instant::now(),
            },
        );
        shared
    }

    /// Forgets the in-flight request for `key`.
    pub async fn dequeue_request(&self, key: &str) {
        self.in_flight.lock().await.remove(key);
    }

    /// Forgets every in-flight request so later fetches start fresh runs.
    ///
    /// Callers already awaiting a forgotten run still receive its result.
    pub async fn clear_in_flight(&self) {
        self.in_flight.lock().await.clear();
    }

    pub async fn request_status(&self, key: &str) -> RequestStatus {
        self.in_flight
            .lock()
            .await
            .get(key)
            .map_or(RequestStatus::Idle, |request| {
                request.status(Instant::now(), self.stale_after)
            })
    }

    /// Cached read-through fetch.
    ///
    /// 1. a live cache entry is returned directly
    /// 2. a live in-flight request for the key is joined
    /// 3. otherwise `fetcher` runs, and its success is cached for `ttl`
    ///
    /// Failures are shared with every waiter and never cached.
    pub async fn fetch_with<F>(&self, key: &str, ttl: Duration, fetcher: F) -> Result<V, RemoteError>
    where
        F: FnOnce() -> FetchFuture<V>,
    {
        if let Some(data) = self.get(key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(data);
        }

        // Check and register under one lock so two callers cannot both start a fetch
        let (shared, owner) = {
            let mut in_flight = self.in_flight.lock().await;
            match live_request(&mut in_flight, key, self.stale_after) {
                Some(pending) => (pending, false),
                None => {
                    let shared = fetcher().shared();
                    in_flight.insert(
                        key.to_string(),
                        QueuedRequest {
                            future: shared.clone(),
                            timestamp: Instant::now(),
                        },
                    );
                    (shared, true)
                }
            }
        };

        if owner {
            tracing::debug!("Cache miss for {}, fetching", key);
        } else {
            tracing::debug!("Joining in-flight request for {}", key);
        }
        // Owner and joined waiters alike settle the record
        let result = shared.clone().await;

        {
            let mut in_flight = self.in_flight.lock().await;
            // A stale replacement may have been queued meanwhile; leave it alone
            if in_flight
                .get(key)
                .is_some_and(|request| request.future.ptr_eq(&shared))
            {
                in_flight.remove(key);
            }
        }

        if let Ok(data) = &result {
            self.set(key, data.clone(), ttl).await;
        }
        result
    }
}

fn live_request<V: Clone>(
    in_flight: &mut HashMap<String, QueuedRequest<V>>,
    key: &str,
    stale_after: Duration,
) -> Option<SharedFetch<V>> {
    let status = in_flight.get(key)?.status(Instant::now(), stale_after);
    match status {
        RequestStatus::Pending => in_flight.get(key).map(|request| request.future.clone()),
        RequestStatus::Idle => {
            tracing::debug!("Dropping stale in-flight request for {}", key);
            in_flight.remove(key);
            None
        }
        RequestStatus::Settled => {
            in_flight.remove(key);
            None
        }
    }
}
