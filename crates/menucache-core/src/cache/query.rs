use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

use super::QueryKey;
use crate::api::ApiError;
use crate::utils::format_age;

/// Entries younger than this are served without a request.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Entries not read for this long are dropped.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(10 * 60);

/// Errors are shared between every caller joined on the same request.
pub type FetchError = Arc<ApiError>;

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub updated_at: Instant,
    pub last_accessed: Instant,
    pub cached_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        let now = Instant::now();
        Self {
            value,
            updated_at: now,
            last_accessed: now,
            cached_at: Utc::now(),
        }
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.updated_at.elapsed() >= stale_time
    }

    fn is_expired(&self, cache_time: Duration) -> bool {
        self.last_accessed.elapsed() >= cache_time
    }

    pub fn age_display(&self) -> String {
        format_age((Utc::now() - self.cached_at).num_minutes())
    }
}

struct CacheState<V> {
    entries: HashMap<QueryKey, CacheEntry<V>>,
    in_flight: HashMap<QueryKey, SharedFetch<V>>,
}

enum Lookup<V> {
    Ready(V),
    Pending(SharedFetch<V>),
}

/// Shared key → value store with stale/retention windows and request
/// de-duplication.
///
/// Cloning is cheap and every clone sees the same entries.
pub struct QueryCache<V> {
    state: Arc<Mutex<CacheState<V>>>,
    stale_time: Duration,
    cache_time: Duration,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            stale_time: self.stale_time,
            cache_time: self.cache_time,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> QueryCache<V> {
    pub fn new() -> Self {
        Self::with_times(DEFAULT_STALE_TIME, DEFAULT_CACHE_TIME)
    }

    pub fn with_times(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            })),
            stale_time,
            cache_time,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a live entry, refreshing its access time. Expired entries are dropped.
    pub fn get(&self, key: &QueryKey) -> Option<V> {
        let mut state = self.lock();
        let expired = state.entries.get(key)?.is_expired(self.cache_time);
        if expired {
            debug!(key = %key, "Evicting expired cache entry");
            state.entries.remove(key);
            return None;
        }
        let entry = state.entries.get_mut(key)?;
        entry.last_accessed = Instant::now();
        Some(entry.value.clone())
    }

    /// Snapshot of an entry's metadata without touching its access time.
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry<V>> {
        let state = self.lock();
        state
            .entries
            .get(key)
            .filter(|e| !e.is_expired(self.cache_time))
            .cloned()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entry(key).is_some()
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.entry(key)
            .map(|e| !e.is_stale(self.stale_time))
            .unwrap_or(false)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock().in_flight.contains_key(key)
    }

    /// Write a value. Writing the same key again replaces the previous snapshot.
    pub fn set(&self, key: QueryKey, value: V) {
        self.lock().entries.insert(key, CacheEntry::new(value));
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry idle for longer than the cache time. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        let cache_time = self.cache_time;
        state.entries.retain(|_, e| !e.is_expired(cache_time));
        before - state.entries.len()
    }

    /// Return a fresh cached value, join an in-flight request for the same
    /// key, or start a new request. Successful results are written to the cache.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        match self.begin(key, fetcher, false) {
            Lookup::Ready(value) => Ok(value),
            Lookup::Pending(shared) => shared.await,
        }
    }

    /// Like [`fetch`](Self::fetch) but ignores freshness. Still joins an
    /// in-flight request for the same key.
    pub async fn refetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        match self.begin(key, fetcher, true) {
            Lookup::Ready(value) => Ok(value),
            Lookup::Pending(shared) => shared.await,
        }
    }

    fn begin<F, Fut>(&self, key: QueryKey, fetcher: F, force: bool) -> Lookup<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let mut state = self.lock();

        if !force {
            if let Some(entry) = state.entries.get_mut(&key) {
                if !entry.is_stale(self.stale_time) && !entry.is_expired(self.cache_time) {
                    entry.last_accessed = Instant::now();
                    debug!(key = %key, "Cache hit");
                    return Lookup::Ready(entry.value.clone());
                }
            }
        }

        if let Some(pending) = state.in_flight.get(&key) {
            debug!(key = %key, "Joining in-flight request");
            return Lookup::Pending(pending.clone());
        }

        debug!(key = %key, "Starting request");
        let request = fetcher();
        let shared_state = Arc::clone(&self.state);
        let entry_key = key.clone();
        let task = async move {
            let result = request.await.map_err(Arc::new);
            let mut state = shared_state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight.remove(&entry_key);
            if let Ok(ref value) = result {
                state
                    .entries
                    .insert(entry_key, CacheEntry::new(value.clone()));
            }
            result
        }
        .boxed()
        .shared();

        state.in_flight.insert(key, task.clone());
        Lookup::Pending(task)
    }
}
