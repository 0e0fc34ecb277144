//! Shared request and response types for the storefront CMS content layer.
//!
//! These mirror the wire shapes of the headless CMS REST API (paginated
//! envelopes, category groupings) and the inbound webhook payload.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options accepted by list reads.
///
/// Every field is optional; absent fields are omitted from both the upstream
/// query string and the cache-key digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQueryOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<NonZeroU32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<NonZeroU32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl ListQueryOptions {
    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        self.limit.is_none()
            && self.page.is_none()
            && self.sort.is_none()
            && self.category_slug.is_none()
            && self.locale.is_none()
    }

    /// Copy of the options with `locale` cleared; locale travels in its own key segment.
    pub fn without_locale(&self) -> Self {
        Self {
            locale: None,
            ..self.clone()
        }
    }
}

/// A CMS document. Only `id` and `slug` are interpreted; everything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Paginated list envelope returned by collection endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDocs<T> {
    pub docs: Vec<T>,
    #[serde(default)]
    pub total_docs: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_prev_page: bool,
    #[serde(default)]
    pub next_page: Option<u32>,
    #[serde(default)]
    pub prev_page: Option<u32>,
    #[serde(default)]
    pub paging_counter: Option<u32>,
}

/// A category bundled with the detail items nested under it.
///
/// Children are read from `pages` or `articles` depending on the endpoint and
/// always written back as `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    #[serde(flatten)]
    pub category: Document,
    #[serde(default, alias = "pages", alias = "articles")]
    pub children: Vec<Document>,
}

/// Response of the `*-categories-with-*` endpoints. `categories` may be absent or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesResponse<T> {
    #[serde(default = "Option::default")]
    pub categories: Option<Vec<T>>,
}

impl<T> CategoriesResponse<T> {
    /// Categories, with an absent or null field read as an empty list.
    pub fn into_categories(self) -> Vec<T> {
        self.categories.unwrap_or_default()
    }
}

/// Body posted by the CMS after a document changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub collection: String,
    #[serde(default)]
    pub doc: Option<WebhookDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDoc {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub locale: Option<Value>,
}

impl WebhookPayload {
    pub fn slug(&self) -> Option<&str> {
        self.doc.as_ref().and_then(|doc| doc.slug.as_deref())
    }

    /// Locale as a string. Non-string JSON values are ignored.
    pub fn locale(&self) -> Option<&str> {
        self.doc
            .as_ref()
            .and_then(|doc| doc.locale.as_ref())
            .and_then(Value::as_str)
    }
}
