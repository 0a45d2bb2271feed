//! Staged category hydration.
//!
//! A `CategoryHydrator` loads the category list for a business, fetches the
//! first category's children straight away, then after a delay fetches every
//! other category in parallel. Results go to the shared query cache and to a
//! local shadow map; `category_details` reads them back synchronously and
//! never triggers a request itself.
//!
//! A "current" category (the one on screen) can be hydrated on demand ahead
//! of the bulk pass. It uses the same cache key, so it joins any in-flight
//! request for that category instead of issuing a second one.
//!
//! Detail failures degrade to empty data and count as settled. Only a failed
//! category list sets the error flag.

pub mod cancel;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::api::CategorySource;
use crate::cache::{FetchError, QueryContext, DEFAULT_CACHE_TIME, DEFAULT_STALE_TIME};
use crate::models::{Category, CategoryDetail, PageRequest};

pub use cancel::CancelToken;

/// Delay between the eager first-category fetch settling and the bulk pass.
pub const DEFAULT_BULK_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct HydratorSettings {
    pub bulk_delay: Duration,
    pub page: PageRequest,
    pub stale_time: Duration,
    pub cache_time: Duration,
}

impl Default for HydratorSettings {
    fn default() -> Self {
        Self {
            bulk_delay: DEFAULT_BULK_DELAY,
            page: PageRequest::default(),
            stale_time: DEFAULT_STALE_TIME,
            cache_time: DEFAULT_CACHE_TIME,
        }
    }
}

/// Where a single category is in its hydration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryState {
    Unfetched,
    Fetching,
    Cached,
    /// Declared with zero items, so never fetched.
    DeclaredEmpty,
}

struct HydratorState<T> {
    categories: Vec<Category>,
    shadow: HashMap<String, CategoryDetail<T>>,
    current: Option<String>,
    list_loaded: bool,
    loading_list: bool,
    loading_first: bool,
    loading_all: bool,
    bulk_settled: bool,
    loading_current: usize,
    error: bool,
}

impl<T> HydratorState<T> {
    fn new() -> Self {
        Self {
            categories: Vec::new(),
            shadow: HashMap::new(),
            current: None,
            list_loaded: false,
            loading_list: false,
            loading_first: false,
            loading_all: false,
            bulk_settled: false,
            loading_current: 0,
            error: false,
        }
    }

    fn find(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }
}

struct Inner<S: CategorySource> {
    source: S,
    queries: QueryContext<S::Item>,
    business_id: Option<String>,
    settings: HydratorSettings,
    state: Mutex<HydratorState<S::Item>>,
    /// Cancelled on unmount. Checked before every local state write.
    lifetime: CancelToken,
    /// Cancelled whenever the category list changes.
    cycle: Mutex<CancelToken>,
}

/// Category-aware cache hydration for one business and one category family.
///
/// Dropping the hydrator unmounts it: pending timers are cancelled and late
/// results no longer touch its local state. Requests already in flight still
/// complete and populate the shared cache.
pub struct CategoryHydrator<S: CategorySource> {
    inner: Arc<Inner<S>>,
}

impl<S: CategorySource> CategoryHydrator<S> {
    /// Start loading the category list for `business_id`.
    ///
    /// Must be called from within a Tokio runtime. Without a business id no
    /// request is made and the hydrator stays empty.
    pub fn mount(
        source: S,
        queries: QueryContext<S::Item>,
        business_id: Option<String>,
        settings: HydratorSettings,
    ) -> Self {
        let business_id = business_id.filter(|id| !id.is_empty());
        let mut state = HydratorState::new();
        state.loading_list = business_id.is_some();

        let inner = Arc::new(Inner {
            source,
            queries,
            business_id,
            settings,
            state: Mutex::new(state),
            lifetime: CancelToken::new(),
            cycle: Mutex::new(CancelToken::new()),
        });

        match inner.business_id {
            Some(ref business_id) => {
                debug!(kind = ?inner.source.kind(), business_id = %business_id, "Mounting category hydrator");
                tokio::spawn(Arc::clone(&inner).load_categories(false));
            }
            None => debug!(kind = ?inner.source.kind(), "No business id, category list disabled"),
        }

        Self { inner }
    }

    /// Categories in server order. Empty until the list has loaded.
    pub fn categories(&self) -> Vec<Category> {
        self.inner.lock_state().categories.clone()
    }

    pub fn business_id(&self) -> Option<&str> {
        self.inner.business_id.as_deref()
    }

    /// Children of a category from whatever has been hydrated so far.
    ///
    /// Resolution order: no categories loaded → empty; declared zero-count →
    /// empty; shared cache; shadow map; empty.
    pub fn category_details(&self, category_id: &str) -> CategoryDetail<S::Item> {
        let Some(business_id) = self.inner.business_id.as_deref() else {
            return CategoryDetail::empty();
        };

        {
            let state = self.inner.lock_state();
            if state.categories.is_empty() {
                return CategoryDetail::empty();
            }
            if state
                .find(category_id)
                .is_some_and(Category::is_declared_empty)
            {
                return CategoryDetail::empty();
            }
        }

        let key = self.inner.source.detail_key(category_id, business_id);
        if let Some(detail) = self.inner.queries.details.get(&key) {
            return detail;
        }

        self.inner
            .lock_state()
            .shadow
            .get(category_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn category_state(&self, category_id: &str) -> CategoryState {
        let Some(business_id) = self.inner.business_id.as_deref() else {
            return CategoryState::Unfetched;
        };

        {
            let state = self.inner.lock_state();
            if state
                .find(category_id)
                .is_some_and(Category::is_declared_empty)
            {
                return CategoryState::DeclaredEmpty;
            }
            if state.shadow.contains_key(category_id) {
                return CategoryState::Cached;
            }
        }

        let key = self.inner.source.detail_key(category_id, business_id);
        if self.inner.queries.details.contains(&key) {
            CategoryState::Cached
        } else if self.inner.queries.details.is_fetching(&key) {
            CategoryState::Fetching
        } else {
            CategoryState::Unfetched
        }
    }

    /// True while the list or the first category is loading.
    pub fn is_loading_initial(&self) -> bool {
        let state = self.inner.lock_state();
        state.loading_list || state.loading_first
    }

    /// True while the bulk pass has requests in flight.
    pub fn is_loading_all(&self) -> bool {
        self.inner.lock_state().loading_all
    }

    /// True while an on-demand fetch for the current category is in flight.
    pub fn is_loading_current(&self) -> bool {
        self.inner.lock_state().loading_current > 0
    }

    /// True when the category list request failed.
    pub fn is_error(&self) -> bool {
        self.inner.lock_state().error
    }

    /// True once every category has either been hydrated or declared empty.
    pub fn is_fully_hydrated(&self) -> bool {
        let ids: Vec<String> = {
            let state = self.inner.lock_state();
            if !state.list_loaded || state.loading_first {
                return false;
            }
            if state.categories.len() > 1 && !state.bulk_settled {
                return false;
            }
            state.categories.iter().map(|c| c.id.clone()).collect()
        };
        ids.iter().all(|id| {
            matches!(
                self.category_state(id),
                CategoryState::Cached | CategoryState::DeclaredEmpty
            )
        })
    }

    /// Re-issue the category-list request, ignoring cache freshness.
    pub fn refetch(&self) {
        if self.inner.business_id.is_none() {
            return;
        }
        self.inner.update(|state| state.loading_list = true);
        tokio::spawn(Arc::clone(&self.inner).load_categories(true));
    }

    /// Mark the category the user is looking at. A known category with a
    /// nonzero count is fetched right away; before the list has loaded the
    /// request waits for it.
    pub fn set_current_category(&self, category_id: Option<&str>) {
        self.inner
            .update(|state| state.current = category_id.map(str::to_string));
        self.inner.hydrate_current();
    }

    pub fn current_category(&self) -> Option<String> {
        self.inner.lock_state().current.clone()
    }

    /// Explicit form of dropping the hydrator.
    pub fn unmount(self) {}
}

impl<S: CategorySource> Drop for CategoryHydrator<S> {
    fn drop(&mut self) {
        debug!(kind = ?self.inner.source.kind(), "Unmounting category hydrator");
        self.inner.lifetime.cancel();
        self.inner.lock_cycle().cancel();
    }
}

impl<S: CategorySource> Inner<S> {
    fn lock_state(&self) -> MutexGuard<'_, HydratorState<S::Item>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cycle(&self) -> MutexGuard<'_, CancelToken> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a local state change unless the hydrator has been unmounted.
    fn update(&self, f: impl FnOnce(&mut HydratorState<S::Item>)) -> bool {
        if self.lifetime.is_cancelled() {
            return false;
        }
        f(&mut self.lock_state());
        true
    }

    async fn load_categories(self: Arc<Self>, force: bool) {
        let Some(business_id) = self.business_id.clone() else {
            return;
        };

        let key = self.source.list_key(&business_id);
        let fetcher = {
            let inner = Arc::clone(&self);
            let business_id = business_id.clone();
            move || async move { inner.source.fetch_categories(&business_id).await }
        };

        let result = if force {
            self.queries.lists.refetch(key, fetcher).await
        } else {
            self.queries.lists.fetch(key, fetcher).await
        };

        if self.lifetime.is_cancelled() {
            debug!("Category list arrived after unmount, dropping");
            return;
        }

        match result {
            Ok(categories) => {
                info!(kind = ?self.source.kind(), count = categories.len(), "Categories loaded");
                self.apply_categories(categories);
            }
            Err(e) => {
                warn!(kind = ?self.source.kind(), error = %e, "Category list fetch failed");
                // A failed refresh keeps the last good list
                self.update(|state| {
                    state.loading_list = false;
                    state.error = true;
                });
            }
        }
    }

    fn apply_categories(self: &Arc<Self>, categories: Vec<Category>) {
        let mut changed = false;
        self.update(|state| {
            state.loading_list = false;
            state.error = false;
            state.list_loaded = true;
            if state.categories != categories {
                changed = true;
                state.categories = categories.clone();
                state.loading_first = !categories.is_empty();
                state.loading_all = false;
                state.bulk_settled = false;
            }
        });

        if !changed {
            debug!("Category list unchanged, keeping current hydration");
            return;
        }

        let cycle = CancelToken::new();
        {
            let mut slot = self.lock_cycle();
            slot.cancel();
            *slot = cycle.clone();
        }

        if !categories.is_empty() {
            tokio::spawn(Arc::clone(self).hydrate(categories, cycle));
        }
        self.hydrate_current();
    }

    /// One hydration cycle: eager first category, delay, then everything else.
    async fn hydrate(self: Arc<Self>, categories: Vec<Category>, cycle: CancelToken) {
        let Some(business_id) = self.business_id.clone() else {
            return;
        };
        let Some(first) = categories.first() else {
            return;
        };

        let eager = if first.is_declared_empty() {
            debug!(category = %first.id, "First category declared empty, skipping request");
            Ok(CategoryDetail::empty())
        } else {
            self.fetch_detail(&first.id, &business_id).await
        };

        let detail = match eager {
            Ok(detail) => {
                debug!(category = %first.id, items = detail.items.len(), "First category hydrated");
                detail
            }
            Err(e) => {
                debug!(category = %first.id, error = %e, "First category fetch failed, showing empty");
                CategoryDetail::empty()
            }
        };

        // A superseded cycle leaves no trace in local state
        self.update(|state| {
            if !cycle.is_cancelled() {
                state.shadow.insert(first.id.clone(), detail);
                state.loading_first = false;
            }
        });

        if categories.len() <= 1 {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.settings.bulk_delay) => {}
            _ = cycle.cancelled() => {
                debug!("Category list changed before bulk fetch, skipping");
                return;
            }
            _ = self.lifetime.cancelled() => {
                debug!("Unmounted before bulk fetch, skipping");
                return;
            }
        }

        if !self.update(|state| state.loading_all = true) {
            return;
        }
        debug!(count = categories.len() - 1, "Starting bulk category fetch");

        let futures = categories.iter().skip(1).map(|category| {
            let inner = Arc::clone(&self);
            let business_id = business_id.clone();
            async move {
                let detail = inner.bulk_fetch_one(category, &business_id).await;
                detail.map(|d| (category.id.clone(), d))
            }
        });
        let results: Vec<_> = join_all(futures).await.into_iter().flatten().collect();
        let fetched = results.len();

        self.update(|state| {
            if !cycle.is_cancelled() {
                state.shadow.extend(results);
                state.loading_all = false;
                state.bulk_settled = true;
            }
        });
        info!(fetched, "Bulk category fetch complete");
    }

    /// Returns None when the shared cache already holds the category.
    async fn bulk_fetch_one(
        self: &Arc<Self>,
        category: &Category,
        business_id: &str,
    ) -> Option<CategoryDetail<S::Item>> {
        if category.is_declared_empty() {
            return Some(CategoryDetail::empty());
        }

        let key = self.source.detail_key(&category.id, business_id);
        if self.queries.details.contains(&key) {
            debug!(category = %category.id, "Already cached, skipping");
            return None;
        }

        match self.fetch_detail(&category.id, business_id).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                debug!(category = %category.id, error = %e, "Bulk fetch failed, using empty");
                Some(CategoryDetail::empty())
            }
        }
    }

    async fn fetch_detail(
        self: &Arc<Self>,
        category_id: &str,
        business_id: &str,
    ) -> Result<CategoryDetail<S::Item>, FetchError> {
        let key = self.source.detail_key(category_id, business_id);
        let inner = Arc::clone(self);
        let category_id = category_id.to_string();
        let business_id = business_id.to_string();
        self.queries
            .details
            .fetch(key, move || async move {
                inner.source.fetch_detail(&category_id, &business_id).await
            })
            .await
    }

    /// Fetch the current category if it is known and has items.
    fn hydrate_current(self: &Arc<Self>) {
        let Some(business_id) = self.business_id.clone() else {
            return;
        };

        let target = {
            let state = self.lock_state();
            let Some(current) = state.current.as_deref() else {
                return;
            };
            if !state.list_loaded {
                debug!(category = %current, "Categories not loaded yet, deferring current fetch");
                return;
            }
            match state.find(current) {
                Some(category) if category.is_declared_empty() => return,
                Some(category) => category.id.clone(),
                None => {
                    debug!(category = %current, "Current category not in list, skipping");
                    return;
                }
            }
        };

        if !self.update(|state| state.loading_current += 1) {
            return;
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let detail = match inner.fetch_detail(&target, &business_id).await {
                Ok(detail) => {
                    debug!(category = %target, items = detail.items.len(), "Current category hydrated");
                    detail
                }
                Err(e) => {
                    debug!(category = %target, error = %e, "Current category fetch failed, showing empty");
                    CategoryDetail::empty()
                }
            };
            inner.update(|state| {
                state.shadow.insert(target, detail);
                state.loading_current = state.loading_current.saturating_sub(1);
            });
        });
    }
}
