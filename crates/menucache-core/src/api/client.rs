//! API client for the restaurant dashboard REST API.
//!
//! This module provides the `ApiClient` struct for signing in and fetching
//! menu and campaign categories together with their child items.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::auth::{BusinessRecord, SessionData};
use crate::models::{
    Campaign, Category, CategoryDetail, CategoryListPayload, DetailPayload, MenuItem, PageRequest,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when no override is configured
pub const DEFAULT_API_BASE_URL: &str = "https://api.menucache.app/v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    business: BusinessRecord,
}

/// API client for the dashboard backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<String>>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: impl Into<Arc<String>>) {
        self.token = Some(token.into());
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: impl Into<Arc<String>>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(token.into()),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Sign in and return the session with the business it belongs to
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<SessionData> {
        let url = format!("{}/auth/login", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to send authentication request")?;

        let response = Self::check_response(response).await?;

        let auth: AuthResponse = response
            .json()
            .await
            .context("Failed to parse auth response")?;

        if auth.business.id.is_empty() {
            return Err(anyhow::anyhow!("Login response did not include a business"));
        }

        Ok(SessionData {
            token: auth.token,
            email: email.to_string(),
            business: auth.business,
            created_at: Utc::now(),
        })
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let token = self.token.as_ref().ok_or(ApiError::NotAuthenticated)?;
        let mut headers = header::HeaderMap::new();
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidResponse("Token is not a valid header value".into()))?;
        headers.insert(header::AUTHORIZATION, value);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(url)
                .headers(self.auth_headers()?)
                .query(query)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    // ===== Menu =====

    /// Fetch the menu categories of a business, in server order
    pub async fn fetch_menu_categories(&self, business_id: &str) -> Result<Vec<Category>, ApiError> {
        let url = format!("{}/menu/categories", self.base_url);
        let payload: CategoryListPayload = self
            .get(&url, &[("businessId", business_id.to_string())])
            .await?;
        let categories: Vec<Category> = payload.into();
        debug!(count = categories.len(), "Menu categories fetched");
        Ok(categories)
    }

    /// Fetch one page of the items in a menu category
    pub async fn fetch_menu_items(
        &self,
        category_id: &str,
        business_id: &str,
        page: PageRequest,
    ) -> Result<CategoryDetail<MenuItem>, ApiError> {
        let url = format!("{}/menu/categories/{}/items", self.base_url, category_id);
        let payload: DetailPayload<MenuItem> = self
            .get(
                &url,
                &[
                    ("businessId", business_id.to_string()),
                    ("page", page.page.to_string()),
                    ("limit", page.page_size.to_string()),
                ],
            )
            .await?;
        Ok(payload.into())
    }

    // ===== Campaigns =====

    /// Fetch the campaign categories of a business, in server order
    pub async fn fetch_campaign_categories(
        &self,
        business_id: &str,
    ) -> Result<Vec<Category>, ApiError> {
        let url = format!("{}/campaigns/categories", self.base_url);
        let payload: CategoryListPayload = self
            .get(&url, &[("businessId", business_id.to_string())])
            .await?;
        let categories: Vec<Category> = payload.into();
        debug!(count = categories.len(), "Campaign categories fetched");
        Ok(categories)
    }

    /// Fetch the campaigns filed under one category
    pub async fn fetch_campaigns_by_category(
        &self,
        category_id: &str,
        business_id: &str,
    ) -> Result<CategoryDetail<Campaign>, ApiError> {
        let url = format!(
            "{}/campaigns/categories/{}/campaigns",
            self.base_url, category_id
        );
        let payload: DetailPayload<Campaign> = self
            .get(&url, &[("businessId", business_id.to_string())])
            .await?;
        Ok(payload.into())
    }
}
