//! Webhook-driven invalidation.
//!
//! A CMS change arrives as `(collection, slug?, locale?)`. The router turns it
//! into an [`InvalidationPlan`] (an exact detail key plus tags whose cached
//! lists embed the changed document) and clears both against the store.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{Collection, WebhookPayload};

use super::keys::detail_key;
use super::store::{CacheStore, ClearTarget, StoreError};
use super::tags::{collection_tag, locale_tag, normalize_locale};

const METRIC_CACHE_INVALIDATION: &str = "cms_cache_invalidation_total";

/// Targets to clear for one CMS change, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationPlan {
    /// Detail entry of the changed document, cleared first.
    pub exact_key: Option<String>,
    /// Tags cleared in a single call after the exact key.
    pub tags: Vec<String>,
}

impl InvalidationPlan {
    pub fn is_empty(&self) -> bool {
        self.exact_key.is_none() && self.tags.is_empty()
    }

    /// `clear` targets in the order they are executed.
    pub fn targets(&self) -> Vec<ClearTarget> {
        let mut targets = Vec::with_capacity(2);
        if let Some(key) = &self.exact_key {
            targets.push(ClearTarget::Key(key.clone()));
        }
        if !self.tags.is_empty() {
            targets.push(ClearTarget::Tags(self.tags.clone()));
        }
        targets
    }
}

/// Maps a CMS change to the cache entries it makes stale.
///
/// A locale of `None` or `"null"` widens the tags to the whole collection.
/// Detail collections also drop the category groupings that embed them.
pub fn compute_invalidation(
    collection: &Collection,
    slug: Option<&str>,
    locale: Option<&str>,
) -> InvalidationPlan {
    let locale = normalize_locale(locale);

    match collection {
        Collection::Pages => detail_plan(collection, &Collection::PageCategories, slug, locale),
        Collection::Articles => {
            detail_plan(collection, &Collection::ArticleCategories, slug, locale)
        }
        Collection::HeroCarousels | Collection::PageCategories | Collection::ArticleCategories => {
            InvalidationPlan {
                exact_key: None,
                tags: vec![scoped_tag(collection, locale)],
            }
        }
        Collection::Other(_) => InvalidationPlan::default(),
    }
}

fn detail_plan(
    collection: &Collection,
    grouping: &Collection,
    slug: Option<&str>,
    locale: Option<&str>,
) -> InvalidationPlan {
    let exact_key = slug.map(|slug| detail_key(collection, slug, locale));
    let tags = match locale {
        Some(locale) => vec![locale_tag(grouping, locale)],
        None => vec![collection_tag(collection), collection_tag(grouping)],
    };
    InvalidationPlan { exact_key, tags }
}

fn scoped_tag(collection: &Collection, locale: Option<&str>) -> String {
    match locale {
        Some(locale) => locale_tag(collection, locale),
        None => collection_tag(collection),
    }
}

/// Executes invalidation plans against a shared store.
///
/// Built without a store (cache disabled) every call is a no-op that still
/// reports the computed plan.
#[derive(Clone)]
pub struct InvalidationRouter {
    store: Option<Arc<dyn CacheStore>>,
}

impl InvalidationRouter {
    pub fn new(store: Option<Arc<dyn CacheStore>>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, collection), fields(collection = %collection))]
    pub async fn invalidate(
        &self,
        collection: &Collection,
        slug: Option<&str>,
        locale: Option<&str>,
    ) -> Result<InvalidationPlan, StoreError> {
        let plan = compute_invalidation(collection, slug, locale);

        let Some(store) = &self.store else {
            debug!(?plan, "Invalidation skipped: cache disabled");
            return Ok(plan);
        };

        for target in plan.targets() {
            debug!(?target, "Clearing cache target");
            store.clear(target).await?;
            counter!(METRIC_CACHE_INVALIDATION, "collection" => collection.as_str().to_string())
                .increment(1);
        }

        info!(
            exact_key = plan.exact_key.as_deref(),
            tags = ?plan.tags,
            "Cache invalidated"
        );
        Ok(plan)
    }

    /// Routes a decoded webhook body. Signature checks belong to the caller.
    pub async fn handle_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> Result<InvalidationPlan, StoreError> {
        let collection = Collection::parse(&payload.collection);
        self.invalidate(&collection, payload.slug(), payload.locale())
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::store::testing::RecordingStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn pages_with_locale_clear_detail_then_grouping_locale() {
        let plan = compute_invalidation(&Collection::Pages, Some("home"), Some("en"));
        assert_eq!(plan.exact_key.as_deref(), Some("cms:pages:home:en"));
        assert_eq!(plan.tags, strings(&["cms:page-categories:locale:en"]));
    }

    #[test]
    fn articles_without_locale_widen_to_collections() {
        let plan = compute_invalidation(&Collection::Articles, Some("launch"), None);
        assert_eq!(plan.exact_key.as_deref(), Some("cms:articles:launch:default"));
        assert_eq!(plan.tags, strings(&["cms:articles", "cms:article-categories"]));
    }

    #[test]
    fn detail_without_slug_has_no_exact_key() {
        let plan = compute_invalidation(&Collection::Pages, None, Some("fr"));
        assert_eq!(plan.exact_key, None);
        assert_eq!(plan.tags, strings(&["cms:page-categories:locale:fr"]));
    }

    #[test]
    fn null_locale_string_behaves_like_absent_locale() {
        let plan = compute_invalidation(&Collection::Pages, Some("home"), Some("null"));
        assert_eq!(plan.tags, strings(&["cms:pages", "cms:page-categories"]));
        assert_eq!(
            plan,
            compute_invalidation(&Collection::Pages, Some("home"), None)
        );
    }

    #[test]
    fn list_collections_never_produce_exact_keys() {
        let cases = [
            (Collection::HeroCarousels, "cms:hero-carousels"),
            (Collection::PageCategories, "cms:page-categories"),
            (Collection::ArticleCategories, "cms:article-categories"),
        ];
        for (collection, tag) in cases {
            let scoped = compute_invalidation(&collection, Some("ignored"), Some("en"));
            assert_eq!(scoped.exact_key, None);
            assert_eq!(scoped.tags, vec![format!("{tag}:locale:en")]);

            let wide = compute_invalidation(&collection, None, None);
            assert_eq!(wide.tags, vec![tag.to_string()]);
        }
    }

    #[test]
    fn unknown_collection_yields_empty_plan() {
        let plan = compute_invalidation(
            &Collection::Other("banners".into()),
            Some("x"),
            Some("en"),
        );
        assert!(plan.is_empty());
        assert!(plan.targets().is_empty());
    }

    #[tokio::test]
    async fn router_clears_exact_key_before_tags() {
        let store = Arc::new(RecordingStore::default());
        let router = InvalidationRouter::new(Some(store.clone()));

        router
            .invalidate(&Collection::Pages, Some("home"), Some("en"))
            .await
            .expect("invalidation should succeed");

        assert_eq!(
            store.clears(),
            vec![
                ClearTarget::Key("cms:pages:home:en".into()),
                ClearTarget::Tags(strings(&["cms:page-categories:locale:en"])),
            ]
        );
    }

    #[tokio::test]
    async fn hero_carousels_without_locale_clear_only_collection_tag() {
        let store = Arc::new(RecordingStore::default());
        let router = InvalidationRouter::new(Some(store.clone()));

        router
            .invalidate(&Collection::HeroCarousels, None, None)
            .await
            .expect("invalidation should succeed");

        assert_eq!(
            store.clears(),
            vec![ClearTarget::Tags(strings(&["cms:hero-carousels"]))]
        );
    }

    #[tokio::test]
    async fn unknown_collection_never_touches_store() {
        let store = Arc::new(RecordingStore::default());
        let router = InvalidationRouter::new(Some(store.clone()));

        router
            .invalidate(&Collection::Other("banners".into()), Some("x"), None)
            .await
            .expect("invalidation should succeed");

        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn disabled_router_reports_plan_without_clearing() {
        let router = InvalidationRouter::new(None);
        let plan = router
            .invalidate(&Collection::Articles, Some("launch"), Some("de"))
            .await
            .expect("invalidation should succeed");
        assert_eq!(plan.exact_key.as_deref(), Some("cms:articles:launch:de"));
    }

    #[tokio::test]
    async fn webhook_payload_routes_through_router() {
        let store = Arc::new(RecordingStore::default());
        let router = InvalidationRouter::new(Some(store.clone()));
        let payload: WebhookPayload = serde_json::from_value(json!({
            "collection": "pages",
            "doc": { "id": 3, "slug": "home", "locale": "null" }
        }))
        .expect("payload should decode");

        router
            .handle_webhook(&payload)
            .await
            .expect("webhook should route");

        assert_eq!(
            store.clears(),
            vec![
                ClearTarget::Key("cms:pages:home:default".into()),
                ClearTarget::Tags(strings(&["cms:pages", "cms:page-categories"])),
            ]
        );
    }
}
