//! Core library for menucache.
//!
//! Loads menu and campaign categories for a restaurant business from the
//! dashboard REST API and hydrates their children into a shared query cache:
//! the first category immediately, the rest in one parallel pass after a short
//! delay, and the category on screen on demand.
//!
//! - `api`: HTTP client and the `CategorySource` trait
//! - `auth`: persisted session (business record) and keychain credentials
//! - `cache`: `QueryCache` with stale/retention windows and request de-duplication
//! - `hydrator`: `CategoryHydrator`, the staged hydration logic
//! - `config`, `context`: configuration and the application context

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod hydrator;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, CampaignSource, CategorySource, MenuSource};
pub use cache::{EntityKind, QueryCache, QueryContext, QueryKey};
pub use config::Config;
pub use context::AppContext;
pub use hydrator::{CategoryHydrator, CategoryState, HydratorSettings};
pub use models::{Campaign, Category, CategoryDetail, MenuItem, PageRequest};
