//! Integration tests for CategoryHydrator.
//!
//! A scripted source stands in for the REST API. Tokio time is paused, so
//! sleeps advance a virtual clock and the staged timings are exact.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use menucache_core::models::DetailPayload;
use menucache_core::{
    ApiError, Category, CategoryDetail, CategoryHydrator, CategorySource, CategoryState,
    EntityKind, HydratorSettings, MenuItem, QueryContext,
};
use tokio::time::{sleep, Instant};

const BUSINESS: &str = "biz-1";

#[derive(Default)]
struct Script {
    /// None makes the list request fail
    categories: Mutex<Option<Vec<Category>>>,
    /// None in the reply makes that detail request fail
    replies: Mutex<HashMap<String, (Option<CategoryDetail<MenuItem>>, Duration)>>,
    list_calls: Mutex<usize>,
    detail_calls: Mutex<Vec<(String, Instant)>>,
}

#[derive(Clone)]
struct ScriptedSource(Arc<Script>);

impl ScriptedSource {
    fn new(categories: Vec<Category>) -> Self {
        let source = Self(Arc::new(Script::default()));
        source.set_categories(Some(categories));
        source
    }

    fn set_categories(&self, categories: Option<Vec<Category>>) {
        *self.0.categories.lock().unwrap() = categories;
    }

    fn reply(&self, category_id: &str, detail: CategoryDetail<MenuItem>, delay: Duration) {
        self.0
            .replies
            .lock()
            .unwrap()
            .insert(category_id.to_string(), (Some(detail), delay));
    }

    fn fail(&self, category_id: &str, delay: Duration) {
        self.0
            .replies
            .lock()
            .unwrap()
            .insert(category_id.to_string(), (None, delay));
    }

    fn list_calls(&self) -> usize {
        *self.0.list_calls.lock().unwrap()
    }

    fn calls_for(&self, category_id: &str) -> usize {
        self.0
            .detail_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == category_id)
            .count()
    }

    fn first_call_at(&self, category_id: &str) -> Option<Instant> {
        self.0
            .detail_calls
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == category_id)
            .map(|(_, at)| *at)
    }

    fn total_detail_calls(&self) -> usize {
        self.0.detail_calls.lock().unwrap().len()
    }
}

impl CategorySource for ScriptedSource {
    type Item = MenuItem;

    fn kind(&self) -> EntityKind {
        EntityKind::Menu
    }

    async fn fetch_categories(&self, _business_id: &str) -> Result<Vec<Category>, ApiError> {
        *self.0.list_calls.lock().unwrap() += 1;
        let categories = self.0.categories.lock().unwrap().clone();
        categories.ok_or_else(|| ApiError::ServerError("category list unavailable".to_string()))
    }

    async fn fetch_detail(
        &self,
        category_id: &str,
        _business_id: &str,
    ) -> Result<CategoryDetail<MenuItem>, ApiError> {
        self.0
            .detail_calls
            .lock()
            .unwrap()
            .push((category_id.to_string(), Instant::now()));
        let reply = self.0.replies.lock().unwrap().get(category_id).cloned();
        match reply {
            Some((result, delay)) => {
                sleep(delay).await;
                result.ok_or_else(|| ApiError::ServerError(format!("{} unavailable", category_id)))
            }
            None => Err(ApiError::NotFound(category_id.to_string())),
        }
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn detail(json: &str) -> CategoryDetail<MenuItem> {
    serde_json::from_str::<DetailPayload<MenuItem>>(json)
        .unwrap()
        .into()
}

fn names(detail: &CategoryDetail<MenuItem>) -> Vec<&str> {
    detail.items.iter().map(|i| i.name.as_str()).collect()
}

fn mount(
    source: &ScriptedSource,
    queries: &QueryContext<MenuItem>,
) -> CategoryHydrator<ScriptedSource> {
    CategoryHydrator::mount(
        source.clone(),
        queries.clone(),
        Some(BUSINESS.to_string()),
        HydratorSettings::default(),
    )
}

fn three_categories() -> Vec<Category> {
    vec![
        Category::new("a", "Drinks", 2),
        Category::new("b", "Mains", 3),
        Category::new("c", "Desserts", 1),
    ]
}

// ============================================================================
// Staged hydration
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_staged_hydration_end_to_end() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Drinks", 2),
        Category::new("b", "Mains", 0),
        Category::new("c", "Desserts", 1),
    ]);
    source.reply(
        "a",
        detail(r#"{"items": [{"id": 1, "name": "Coke"}, {"id": 2, "name": "Fanta"}], "totalCount": 2}"#),
        ms(10),
    );
    source.reply(
        "c",
        detail(r#"{"items": [{"id": 3, "name": "Cake"}], "totalCount": 1}"#),
        ms(10),
    );
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    // Nothing has resolved yet
    assert!(hydrator.category_details("a").is_empty());
    assert!(hydrator.is_loading_initial());

    sleep(ms(50)).await;
    let drinks = hydrator.category_details("a");
    assert_eq!(names(&drinks), vec!["Coke", "Fanta"]);
    assert_eq!(drinks.total_count, 2);
    assert!(hydrator.category_details("b").is_empty());
    assert!(hydrator.category_details("c").is_empty());
    assert!(!hydrator.is_loading_initial());
    assert_eq!(hydrator.categories().len(), 3);

    sleep(ms(2050)).await;
    let desserts = hydrator.category_details("c");
    assert_eq!(names(&desserts), vec!["Cake"]);
    assert_eq!(desserts.total_count, 1);

    assert_eq!(source.calls_for("b"), 0);
    assert!(!hydrator.is_loading_all());
    assert!(hydrator.is_fully_hydrated());
}

#[tokio::test(start_paused = true)]
async fn test_bulk_fetch_waits_for_delay_after_first_settles() {
    let source = ScriptedSource::new(three_categories());
    for id in ["a", "b", "c"] {
        source.reply(id, detail(r#"[{"id": 1, "name": "Item"}]"#), ms(10));
    }
    let queries = QueryContext::new();
    let start = Instant::now();
    let hydrator = mount(&source, &queries);

    sleep(ms(1500)).await;
    assert_eq!(source.calls_for("a"), 1);
    assert_eq!(source.calls_for("b"), 0);
    assert_eq!(source.calls_for("c"), 0);

    sleep(ms(600)).await;
    let first_at = source.first_call_at("a").unwrap();
    // "a" settles 10ms after it was requested
    let first_settled = first_at + ms(10);
    for id in ["b", "c"] {
        let at = source.first_call_at(id).expect("bulk fetch should have run");
        assert!(at >= first_settled + ms(2000), "{} requested too early", id);
    }
    assert!(first_at - start < ms(10));
    assert_eq!(hydrator.category_details("b").items.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_single_category_has_no_bulk_pass() {
    let source = ScriptedSource::new(vec![Category::new("a", "Drinks", 1)]);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(3000)).await;
    assert_eq!(source.total_detail_calls(), 1);
    assert!(!hydrator.is_loading_all());
    assert!(hydrator.is_fully_hydrated());
}

// ============================================================================
// Zero-count categories
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_zero_count_categories_never_hit_the_network() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Seasonal", 0),
        Category::new("b", "Brunch", 0),
    ]);
    // Even a scripted reply must never be requested
    source.reply("a", detail(r#"[{"id": 1, "name": "Ghost"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    for _ in 0..5 {
        assert!(hydrator.category_details("a").is_empty());
        sleep(ms(700)).await;
    }
    hydrator.set_current_category(Some("a"));
    sleep(ms(100)).await;

    assert!(hydrator.category_details("a").is_empty());
    assert!(hydrator.category_details("b").is_empty());
    assert_eq!(hydrator.category_state("a"), CategoryState::DeclaredEmpty);
    assert_eq!(source.total_detail_calls(), 0);
    assert!(!hydrator.is_loading_current());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_one_failing_category_does_not_affect_others() {
    let source = ScriptedSource::new(three_categories());
    source.reply("a", detail(r#"[{"id": 1, "name": "Coke"}]"#), ms(10));
    source.fail("b", ms(10));
    source.reply("c", detail(r#"[{"id": 3, "name": "Cake"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(2100)).await;
    assert_eq!(names(&hydrator.category_details("a")), vec!["Coke"]);
    assert_eq!(names(&hydrator.category_details("c")), vec!["Cake"]);
    let mains = hydrator.category_details("b");
    assert!(mains.items.is_empty());
    assert_eq!(mains.total_count, 0);
    assert!(!hydrator.is_error());
    assert!(!hydrator.is_loading_all());
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_category_shows_empty_and_bulk_still_runs() {
    let source = ScriptedSource::new(three_categories());
    source.fail("a", ms(10));
    source.reply("b", detail(r#"[{"id": 2, "name": "Pasta"}]"#), ms(10));
    source.reply("c", detail(r#"[{"id": 3, "name": "Cake"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(50)).await;
    assert!(hydrator.category_details("a").is_empty());
    assert!(!hydrator.is_loading_initial());
    assert!(!hydrator.is_error());

    sleep(ms(2050)).await;
    assert_eq!(names(&hydrator.category_details("b")), vec!["Pasta"]);
    assert_eq!(names(&hydrator.category_details("c")), vec!["Cake"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_category_still_completes_hydration() {
    let source = ScriptedSource::new(three_categories());
    source.fail("a", ms(10));
    source.reply("b", detail(r#"[{"id": 2, "name": "Pasta"}]"#), ms(10));
    source.reply("c", detail(r#"[{"id": 3, "name": "Cake"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(50)).await;
    assert_eq!(hydrator.category_state("a"), CategoryState::Cached);

    sleep(ms(2050)).await;
    assert!(hydrator.is_fully_hydrated());
    assert!(hydrator.category_details("a").is_empty());
    // Not retried by the bulk pass
    assert_eq!(source.calls_for("a"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_current_category_settles_as_empty() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Drinks", 1),
        Category::new("b", "Mains", 2),
    ]);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    source.fail("b", ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(50)).await;

    hydrator.set_current_category(Some("b"));
    sleep(ms(50)).await;

    assert!(!hydrator.is_loading_current());
    assert_eq!(hydrator.category_state("b"), CategoryState::Cached);
    assert!(hydrator.category_details("b").is_empty());
    assert!(!hydrator.is_error());
}

#[tokio::test(start_paused = true)]
async fn test_category_without_count_is_fetched() {
    let categories: Vec<Category> = serde_json::from_str(
        r#"[{"id": "a", "name": "Drinks"}, {"id": "b", "name": "Mains"}]"#,
    )
    .unwrap();
    let source = ScriptedSource::new(categories);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    source.reply("b", detail(r#"[{"id": 2, "name": "Pasta"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(2100)).await;
    assert_eq!(names(&hydrator.category_details("a")), vec!["Water"]);
    assert_eq!(names(&hydrator.category_details("b")), vec!["Pasta"]);
    assert_eq!(hydrator.category_state("a"), CategoryState::Cached);
}

#[tokio::test(start_paused = true)]
async fn test_list_failure_sets_error_and_skips_hydration() {
    let source = ScriptedSource::new(Vec::new());
    source.set_categories(None);
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(3000)).await;
    assert!(hydrator.is_error());
    assert!(hydrator.categories().is_empty());
    assert!(!hydrator.is_loading_initial());
    assert!(hydrator.category_details("a").is_empty());
    assert_eq!(source.total_detail_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refetch_keeps_last_good_list() {
    let source = ScriptedSource::new(vec![Category::new("a", "Drinks", 1)]);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(50)).await;

    source.set_categories(None);
    hydrator.refetch();
    sleep(ms(50)).await;

    assert!(hydrator.is_error());
    assert_eq!(hydrator.categories().len(), 1);
    assert_eq!(names(&hydrator.category_details("a")), vec!["Water"]);
}

// ============================================================================
// Payload shapes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_payload_shapes_resolve_to_the_same_detail() {
    let source = ScriptedSource::new(vec![
        Category::new("bare", "Bare", 1),
        Category::new("items", "Items", 1),
        Category::new("campaigns", "Campaigns", 1),
    ]);
    source.reply("bare", detail(r#"[{"id": 5, "name": "Soup"}]"#), ms(10));
    source.reply("items", detail(r#"{"items": [{"id": 5, "name": "Soup"}]}"#), ms(10));
    source.reply(
        "campaigns",
        detail(r#"{"campaigns": [{"id": 5, "name": "Soup"}], "totalCount": 1}"#),
        ms(10),
    );
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(2100)).await;
    let bare = hydrator.category_details("bare");
    assert_eq!(bare.total_count, 1);
    assert_eq!(bare, hydrator.category_details("items"));
    assert_eq!(bare, hydrator.category_details("campaigns"));
}

// ============================================================================
// Unmount and category changes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unmount_before_timer_skips_bulk_fetch() {
    let source = ScriptedSource::new(three_categories());
    for id in ["a", "b", "c"] {
        source.reply(id, detail(r#"[{"id": 1, "name": "Item"}]"#), ms(10));
    }
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(50)).await;
    hydrator.unmount();
    sleep(ms(5000)).await;

    assert_eq!(source.calls_for("a"), 1);
    assert_eq!(source.calls_for("b"), 0);
    assert_eq!(source.calls_for("c"), 0);
    // What was fetched before unmount stays in the shared cache
    assert_eq!(queries.details.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_during_first_fetch_still_fills_shared_cache() {
    let source = ScriptedSource::new(three_categories());
    source.reply("a", detail(r#"[{"id": 1, "name": "Coke"}]"#), ms(100));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    sleep(ms(20)).await;
    drop(hydrator);
    sleep(ms(3000)).await;

    assert_eq!(queries.details.len(), 1);
    assert_eq!(source.total_detail_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_changed_categories_cancel_pending_bulk_fetch() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Drinks", 1),
        Category::new("b", "Mains", 1),
    ]);
    for id in ["a", "b", "a2", "c"] {
        source.reply(id, detail(r#"[{"id": 1, "name": "Item"}]"#), ms(10));
    }
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(50)).await;

    source.set_categories(Some(vec![
        Category::new("a2", "Drinks", 1),
        Category::new("c", "Desserts", 1),
    ]));
    hydrator.refetch();
    sleep(ms(2100)).await;

    assert_eq!(source.calls_for("b"), 0);
    assert_eq!(source.calls_for("a2"), 1);
    assert_eq!(source.calls_for("c"), 1);
    assert_eq!(hydrator.categories()[0].id, "a2");
    assert!(hydrator.is_fully_hydrated());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_first_fetch_leaves_no_local_state() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Drinks", 1),
        Category::new("b", "Mains", 1),
    ]);
    source.fail("a", ms(100));
    source.reply("c", detail(r#"[{"id": 3, "name": "Cake"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(20)).await;

    source.set_categories(Some(vec![Category::new("c", "Desserts", 1)]));
    hydrator.refetch();
    sleep(ms(200)).await;

    assert_eq!(source.calls_for("a"), 1);
    assert_eq!(hydrator.category_state("a"), CategoryState::Unfetched);
    assert_eq!(names(&hydrator.category_details("c")), vec!["Cake"]);
    assert!(hydrator.is_fully_hydrated());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_bulk_fetch_leaves_no_local_state() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Drinks", 1),
        Category::new("b", "Mains", 1),
    ]);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    source.fail("b", ms(500));
    source.reply("c", detail(r#"[{"id": 3, "name": "Cake"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);

    // Bulk request for "b" starts at 2010ms and is still in flight
    sleep(ms(2100)).await;
    assert_eq!(source.calls_for("b"), 1);
    assert!(hydrator.is_loading_all());

    source.set_categories(Some(vec![Category::new("c", "Desserts", 1)]));
    hydrator.refetch();
    sleep(ms(1000)).await;

    assert_eq!(hydrator.category_state("b"), CategoryState::Unfetched);
    assert!(!hydrator.is_loading_all());
    assert!(hydrator.is_fully_hydrated());
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_refetch_keeps_hydration_cycle() {
    let source = ScriptedSource::new(vec![
        Category::new("a", "Drinks", 1),
        Category::new("b", "Mains", 1),
    ]);
    for id in ["a", "b"] {
        source.reply(id, detail(r#"[{"id": 1, "name": "Item"}]"#), ms(10));
    }
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(50)).await;

    hydrator.refetch();
    sleep(ms(2100)).await;

    assert_eq!(source.list_calls(), 2);
    assert_eq!(source.calls_for("a"), 1);
    assert_eq!(source.calls_for("b"), 1);
}

// ============================================================================
// On-demand current category and cache sharing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_current_category_fetched_ahead_of_bulk_pass() {
    let source = ScriptedSource::new(three_categories());
    for id in ["a", "b", "c"] {
        source.reply(id, detail(r#"[{"id": 1, "name": "Item"}]"#), ms(10));
    }
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(50)).await;

    hydrator.set_current_category(Some("c"));
    assert!(hydrator.is_loading_current());
    sleep(ms(1)).await;
    assert_eq!(hydrator.category_state("c"), CategoryState::Fetching);

    sleep(ms(50)).await;
    assert!(!hydrator.is_loading_current());
    assert_eq!(hydrator.category_details("c").items.len(), 1);
    assert_eq!(hydrator.category_state("b"), CategoryState::Unfetched);

    sleep(ms(2100)).await;
    // The bulk pass found "c" cached and skipped it
    assert_eq!(source.calls_for("c"), 1);
    assert_eq!(source.calls_for("b"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_current_category_before_list_joins_eager_fetch() {
    let source = ScriptedSource::new(three_categories());
    for id in ["a", "b", "c"] {
        source.reply(id, detail(r#"[{"id": 1, "name": "Item"}]"#), ms(10));
    }
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    hydrator.set_current_category(Some("a"));

    sleep(ms(2100)).await;
    assert_eq!(source.calls_for("a"), 1);
    assert_eq!(queries.details.len(), 3);

    // Bulk already cached "b", so showing it is served from the cache
    hydrator.set_current_category(Some("b"));
    sleep(ms(50)).await;
    assert_eq!(source.calls_for("b"), 1);
    assert_eq!(hydrator.current_category().as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_current_category_is_ignored() {
    let source = ScriptedSource::new(vec![Category::new("a", "Drinks", 1)]);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    let queries = QueryContext::new();
    let hydrator = mount(&source, &queries);
    sleep(ms(50)).await;

    hydrator.set_current_category(Some("zzz"));
    sleep(ms(50)).await;
    assert_eq!(source.calls_for("zzz"), 0);
    assert!(hydrator.category_details("zzz").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_mount_reuses_fresh_cache() {
    let source = ScriptedSource::new(vec![Category::new("a", "Drinks", 1)]);
    source.reply("a", detail(r#"[{"id": 1, "name": "Water"}]"#), ms(10));
    let queries = QueryContext::new();

    let first = mount(&source, &queries);
    sleep(ms(50)).await;
    drop(first);

    let second = mount(&source, &queries);
    sleep(ms(50)).await;
    assert_eq!(source.list_calls(), 1);
    assert_eq!(source.calls_for("a"), 1);
    assert_eq!(names(&second.category_details("a")), vec!["Water"]);
}

#[tokio::test(start_paused = true)]
async fn test_without_business_id_nothing_is_requested() {
    let source = ScriptedSource::new(three_categories());
    let hydrator = CategoryHydrator::mount(
        source.clone(),
        QueryContext::new(),
        None,
        HydratorSettings::default(),
    );

    sleep(ms(3000)).await;
    assert_eq!(source.list_calls(), 0);
    assert!(!hydrator.is_loading_initial());
    assert!(hydrator.categories().is_empty());
    assert!(hydrator.category_details("a").is_empty());
    hydrator.refetch();
    sleep(ms(50)).await;
    assert_eq!(source.list_calls(), 0);
}
