//! Domain layer types.

pub mod types;

pub use storefront_cms_types::{
    CategoriesResponse, CategoryGroup, Document, ListQueryOptions, PaginatedDocs, WebhookDoc,
    WebhookPayload,
};
pub use types::{Collection, Grouping};
