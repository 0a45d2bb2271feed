//! Data models for menu and campaign categories.
//!
//! - `Category`: a menu section or campaign category with its item count
//! - `CategoryDetail`: the child items of one category
//! - `MenuItem`, `Campaign`: the two kinds of child item
//! - `DetailPayload`, `CategoryListPayload`: wire shapes, normalized on ingestion

pub mod campaign;
pub mod category;
pub mod menu;
pub mod payload;

pub use campaign::Campaign;
pub use category::{Category, CategoryDetail};
pub use menu::{MenuItem, PageRequest};
pub use payload::{CategoryListPayload, DetailPayload};
