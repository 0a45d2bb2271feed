//! Hydrate a category family and print it.

use std::time::Duration;

use anyhow::{bail, Result};
use menucache_core::utils::truncate_string;
use menucache_core::{
    AppContext, Campaign, CategoryHydrator, CategorySource, CategoryState, MenuItem,
};
use tracing::{debug, warn};

/// Interval between hydration progress checks
const POLL_INTERVAL_MS: u64 = 100;

/// Extra time allowed on top of the bulk delay before giving up
const HYDRATION_GRACE_SECS: u64 = 60;

const NAME_WIDTH: usize = 36;

pub async fn menu(ctx: &AppContext, category: Option<&str>) -> Result<()> {
    let hydrator = ctx.menu_hydrator();
    show(ctx, &hydrator, category, menu_row).await
}

pub async fn campaigns(ctx: &AppContext, category: Option<&str>) -> Result<()> {
    let hydrator = ctx.campaign_hydrator();
    show(ctx, &hydrator, category, campaign_row).await
}

async fn show<S: CategorySource>(
    ctx: &AppContext,
    hydrator: &CategoryHydrator<S>,
    category: Option<&str>,
    row: fn(&S::Item) -> String,
) -> Result<()> {
    if hydrator.business_id().is_none() {
        bail!("No business selected. Run `menucache login` first.");
    }
    if let Some(id) = category {
        hydrator.set_current_category(Some(id));
    }

    let timeout = ctx.settings().bulk_delay + Duration::from_secs(HYDRATION_GRACE_SECS);
    if !wait_until_ready(hydrator, category, timeout).await {
        warn!(?timeout, "Hydration did not finish in time, printing partial data");
    }

    if hydrator.is_error() {
        bail!("Failed to load categories");
    }

    let categories = hydrator.categories();
    if categories.is_empty() {
        println!("No categories.");
        return Ok(());
    }

    let shown: Vec<_> = match category {
        Some(id) => {
            let Some(found) = categories.iter().find(|c| c.id == id) else {
                bail!("Unknown category: {}", id);
            };
            vec![found.clone()]
        }
        None => categories,
    };

    for category in &shown {
        let detail = hydrator.category_details(&category.id);
        println!("{} ({})", category.name, category.display_count());
        if detail.items.is_empty() {
            println!("  (empty)");
        }
        for item in &detail.items {
            println!("  {}", row(item));
        }
        if (detail.items.len() as u64) < detail.total_count {
            println!(
                "  ... {} more",
                detail.total_count - detail.items.len() as u64
            );
        }
        println!();
    }
    Ok(())
}

/// Poll until everything requested has settled. Returns false on timeout.
async fn wait_until_ready<S: CategorySource>(
    hydrator: &CategoryHydrator<S>,
    category: Option<&str>,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if is_ready(hydrator, category) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
    }
}

fn is_ready<S: CategorySource>(hydrator: &CategoryHydrator<S>, category: Option<&str>) -> bool {
    if hydrator.is_error() {
        return true;
    }
    match category {
        Some(id) => {
            if hydrator.is_loading_initial() || hydrator.is_loading_current() {
                return false;
            }
            let known = hydrator.categories().iter().any(|c| c.id == id);
            let state = hydrator.category_state(id);
            debug!(category = %id, ?state, "Waiting for category");
            !known || matches!(state, CategoryState::Cached | CategoryState::DeclaredEmpty)
        }
        None => hydrator.is_fully_hydrated(),
    }
}

fn menu_row(item: &MenuItem) -> String {
    let mut row = format!(
        "{:<width$} {:>9}",
        truncate_string(&item.name, NAME_WIDTH),
        item.price_display(),
        width = NAME_WIDTH
    );
    if !item.available {
        row.push_str("  (unavailable)");
    }
    row
}

fn campaign_row(campaign: &Campaign) -> String {
    format!(
        "{:<width$} {:<10} {}",
        truncate_string(&campaign.name, NAME_WIDTH),
        campaign.status.as_deref().unwrap_or("-"),
        campaign.date_range(),
        width = NAME_WIDTH
    )
}
