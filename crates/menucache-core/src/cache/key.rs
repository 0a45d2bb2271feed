use std::fmt;

use crate::models::PageRequest;

/// Which family of categories a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Menu,
    Campaign,
}

impl EntityKind {
    fn list_label(&self) -> &'static str {
        match self {
            EntityKind::Menu => "menuCategories",
            EntityKind::Campaign => "campaignCategories",
        }
    }

    fn detail_label(&self) -> &'static str {
        match self {
            EntityKind::Menu => "menuItems",
            EntityKind::Campaign => "campaigns",
        }
    }
}

/// Composite cache key.
///
/// Two queries share a cache entry (and an in-flight request) exactly when
/// their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CategoryList {
        kind: EntityKind,
        business_id: String,
    },
    CategoryDetail {
        kind: EntityKind,
        category_id: String,
        business_id: String,
        page: Option<PageRequest>,
    },
}

impl QueryKey {
    pub fn list(kind: EntityKind, business_id: &str) -> Self {
        QueryKey::CategoryList {
            kind,
            business_id: business_id.to_string(),
        }
    }

    pub fn detail(
        kind: EntityKind,
        category_id: &str,
        business_id: &str,
        page: Option<PageRequest>,
    ) -> Self {
        QueryKey::CategoryDetail {
            kind,
            category_id: category_id.to_string(),
            business_id: business_id.to_string(),
            page,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::CategoryList { kind, business_id } => {
                write!(f, "{}/{}", kind.list_label(), business_id)
            }
            QueryKey::CategoryDetail {
                kind,
                category_id,
                business_id,
                page,
            } => {
                write!(f, "{}/{}/{}", kind.detail_label(), category_id, business_id)?;
                if let Some(page) = page {
                    write!(f, "/p{}x{}", page.page, page.page_size)?;
                }
                Ok(())
            }
        }
    }
}
