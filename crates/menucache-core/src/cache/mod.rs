//! In-memory query cache.
//!
//! `QueryCache` stores fetched values under a composite `QueryKey`. Entries
//! are served without a request for 5 minutes and dropped after 10 minutes
//! without a read. Concurrent fetches of the same key share one request.
//!
//! `QueryContext` bundles the two caches a category family needs: one for
//! category lists and one for per-category details.

pub mod key;
pub mod query;

use crate::models::{Category, CategoryDetail};

pub use key::{EntityKind, QueryKey};
pub use query::{CacheEntry, FetchError, QueryCache, DEFAULT_CACHE_TIME, DEFAULT_STALE_TIME};

pub struct QueryContext<T> {
    pub lists: QueryCache<Vec<Category>>,
    pub details: QueryCache<CategoryDetail<T>>,
}

impl<T> Clone for QueryContext<T> {
    fn clone(&self) -> Self {
        Self {
            lists: self.lists.clone(),
            details: self.details.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> QueryContext<T> {
    pub fn new() -> Self {
        Self {
            lists: QueryCache::new(),
            details: QueryCache::new(),
        }
    }

    pub fn with_times(stale_time: std::time::Duration, cache_time: std::time::Duration) -> Self {
        Self {
            lists: QueryCache::with_times(stale_time, cache_time),
            details: QueryCache::with_times(stale_time, cache_time),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for QueryContext<T> {
    fn default() -> Self {
        Self::new()
    }
}
