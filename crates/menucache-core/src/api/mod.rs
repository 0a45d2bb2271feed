//! REST API client module for the restaurant dashboard backend.
//!
//! This module provides the `ApiClient` for signing in and fetching menu and
//! campaign categories, and the `CategorySource` trait the hydrator consumes.
//! `MenuSource` and `CampaignSource` adapt the client to that trait.
//!
//! The API uses bearer token authentication obtained from `/auth/login`.

pub mod client;
pub mod error;
pub mod source;

pub use client::{ApiClient, DEFAULT_API_BASE_URL};
pub use error::ApiError;
pub use source::{CampaignSource, CategorySource, MenuSource};
