use std::future::Future;

use crate::cache::{EntityKind, QueryKey};
use crate::models::{Campaign, Category, CategoryDetail, MenuItem, PageRequest};

use super::{ApiClient, ApiError};

/// Where a hydrator gets its categories and their children from.
pub trait CategorySource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    fn kind(&self) -> EntityKind;

    /// Page requested for every detail call, if the endpoint is paginated.
    fn page(&self) -> Option<PageRequest> {
        None
    }

    fn fetch_categories(
        &self,
        business_id: &str,
    ) -> impl Future<Output = Result<Vec<Category>, ApiError>> + Send;

    fn fetch_detail(
        &self,
        category_id: &str,
        business_id: &str,
    ) -> impl Future<Output = Result<CategoryDetail<Self::Item>, ApiError>> + Send;

    fn list_key(&self, business_id: &str) -> QueryKey {
        QueryKey::list(self.kind(), business_id)
    }

    fn detail_key(&self, category_id: &str, business_id: &str) -> QueryKey {
        QueryKey::detail(self.kind(), category_id, business_id, self.page())
    }
}

/// Menu categories and one page of their items.
#[derive(Clone)]
pub struct MenuSource {
    api: ApiClient,
    page: PageRequest,
}

impl MenuSource {
    pub fn new(api: ApiClient, page: PageRequest) -> Self {
        Self { api, page }
    }
}

impl CategorySource for MenuSource {
    type Item = MenuItem;

    fn kind(&self) -> EntityKind {
        EntityKind::Menu
    }

    fn page(&self) -> Option<PageRequest> {
        Some(self.page)
    }

    async fn fetch_categories(&self, business_id: &str) -> Result<Vec<Category>, ApiError> {
        self.api.fetch_menu_categories(business_id).await
    }

    async fn fetch_detail(
        &self,
        category_id: &str,
        business_id: &str,
    ) -> Result<CategoryDetail<MenuItem>, ApiError> {
        self.api
            .fetch_menu_items(category_id, business_id, self.page)
            .await
    }
}

/// Campaign categories and their campaigns.
#[derive(Clone)]
pub struct CampaignSource {
    api: ApiClient,
}

impl CampaignSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl CategorySource for CampaignSource {
    type Item = Campaign;

    fn kind(&self) -> EntityKind {
        EntityKind::Campaign
    }

    async fn fetch_categories(&self, business_id: &str) -> Result<Vec<Category>, ApiError> {
        self.api.fetch_campaign_categories(business_id).await
    }

    async fn fetch_detail(
        &self,
        category_id: &str,
        business_id: &str,
    ) -> Result<CategoryDetail<Campaign>, ApiError> {
        self.api
            .fetch_campaigns_by_category(category_id, business_id)
            .await
    }
}
