//! Wire shapes returned by the category endpoints.
//!
//! Detail endpoints are inconsistent: some return a bare array, some wrap the
//! list in `items`, and the campaign endpoints wrap it in `campaigns`. Each
//! shape is a variant here and is normalized into [`CategoryDetail`] once,
//! when the response is parsed.

use serde::{Deserialize, Deserializer};

use super::{Category, CategoryDetail};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DetailPayload<T> {
    Bare(Vec<T>),
    Items {
        items: Vec<T>,
        #[serde(rename = "totalCount", alias = "total", default)]
        total_count: Option<u64>,
    },
    Campaigns {
        campaigns: Vec<T>,
        #[serde(rename = "totalCount", alias = "total", default)]
        total_count: Option<u64>,
    },
}

impl<T> From<DetailPayload<T>> for CategoryDetail<T> {
    fn from(payload: DetailPayload<T>) -> Self {
        let (items, total_count) = match payload {
            DetailPayload::Bare(items) => (items, None),
            DetailPayload::Items { items, total_count } => (items, total_count),
            DetailPayload::Campaigns {
                campaigns,
                total_count,
            } => (campaigns, total_count),
        };
        let total_count = total_count.unwrap_or(items.len() as u64);
        CategoryDetail { items, total_count }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CategoryListPayload {
    Bare(Vec<Category>),
    Wrapped {
        #[serde(alias = "data")]
        categories: Vec<Category>,
    },
}

impl From<CategoryListPayload> for Vec<Category> {
    fn from(payload: CategoryListPayload) -> Self {
        match payload {
            CategoryListPayload::Bare(categories) => categories,
            CategoryListPayload::Wrapped { categories } => categories,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Accept ids sent either as JSON strings or numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}
