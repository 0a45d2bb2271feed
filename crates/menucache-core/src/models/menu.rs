use serde::{Deserialize, Serialize};

use super::payload::string_or_number;
use crate::utils::format_price;

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MenuItem {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "isAvailable", alias = "available", default = "default_available")]
    pub available: bool,
}

impl MenuItem {
    pub fn price_display(&self) -> String {
        match self.price {
            Some(price) => format_price(price),
            None => "-".to_string(),
        }
    }
}

/// Page selection for paginated menu-item requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}
