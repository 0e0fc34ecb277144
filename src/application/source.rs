//! Content source trait describing the upstream adapter.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CategoriesResponse, Collection, Grouping, ListQueryOptions, PaginatedDocs};
use crate::infra::cms::CmsError;

/// Upstream reads the content service performs on a cache miss.
///
/// Documents travel as raw JSON so the service can cache exactly what the
/// CMS returned and decode into the caller's type afterwards.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First published document with `slug`, or `None`.
    async fn find_published_by_slug(
        &self,
        collection: &Collection,
        slug: &str,
        locale: Option<&str>,
    ) -> Result<Option<Value>, CmsError>;

    /// Published documents matching `options`, including `options.locale`.
    async fn find_published(
        &self,
        collection: &Collection,
        options: &ListQueryOptions,
    ) -> Result<PaginatedDocs<Value>, CmsError>;

    async fn categories_with_children(
        &self,
        grouping: Grouping,
        locale: Option<&str>,
        category_slug: Option<&str>,
    ) -> Result<CategoriesResponse<Value>, CmsError>;
}
