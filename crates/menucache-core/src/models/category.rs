use serde::{Deserialize, Serialize};

use super::payload::string_or_number;

/// A named grouping of child items (a menu section or a campaign category).
///
/// `total_count` comes from the category-list call, so the number of children
/// is usually known before any detail request is made. It is `None` when the
/// server omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Category {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "categoryName")]
    pub name: String,
    #[serde(rename = "totalCount", alias = "itemCount", alias = "count", default)]
    pub total_count: Option<u64>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_count: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_count: Some(total_count),
        }
    }

    /// Only an explicit zero count skips the detail request. A missing count
    /// is not a declaration.
    pub fn is_declared_empty(&self) -> bool {
        self.total_count == Some(0)
    }

    pub fn display_count(&self) -> String {
        match self.total_count {
            Some(1) => "1 item".to_string(),
            Some(n) => format!("{} items", n),
            None => "? items".to_string(),
        }
    }
}

/// The child items of one category plus the server's total count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetail<T> {
    pub items: Vec<T>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

impl<T> CategoryDetail<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.total_count == 0
    }
}

impl<T> Default for CategoryDetail<T> {
    fn default() -> Self {
        Self::empty()
    }
}
