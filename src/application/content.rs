//! Cached read access to published CMS content.
//!
//! Every read probes the cache first. On a miss the upstream is queried and
//! the raw JSON result stored with a TTL and invalidation tags. Concurrent
//! misses on the same key each fetch; the last write wins.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::application::source::ContentSource;
use crate::cache::{
    CacheConfig, CacheStore, InvalidationRouter, StoreError, TagSet, build_key, detail_key,
    detail_tags, digest, grouping_tags, list_tags,
};
use crate::domain::{Collection, Grouping, ListQueryOptions};
use crate::infra::cms::CmsError;

const METRIC_CACHE_HIT: &str = "cms_cache_hit_total";
const METRIC_CACHE_MISS: &str = "cms_cache_miss_total";
const METRIC_CACHE_STORE: &str = "cms_cache_store_total";

/// Discriminator of a grouping read without a category filter.
const ALL_CATEGORIES: &str = "all";

#[derive(Clone)]
pub struct ContentService {
    source: Arc<dyn ContentSource>,
    store: Option<Arc<dyn CacheStore>>,
    config: CacheConfig,
}

impl ContentService {
    pub fn new(
        source: Arc<dyn ContentSource>,
        store: Arc<dyn CacheStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            source,
            store: Some(store),
            config,
        }
    }

    /// A service that never touches a cache store.
    pub fn uncached(source: Arc<dyn ContentSource>, config: CacheConfig) -> Self {
        Self {
            source,
            store: None,
            config,
        }
    }

    /// Resolves the store once; a resolution failure disables caching for the
    /// lifetime of the service instead of failing construction.
    pub fn with_store_resolver<F>(
        source: Arc<dyn ContentSource>,
        config: CacheConfig,
        resolve: F,
    ) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn CacheStore>, StoreError>,
    {
        match resolve() {
            Ok(store) => Self::new(source, store, config),
            Err(err) => {
                warn!(error = %err, "Cache store unavailable; content cache disabled");
                Self::uncached(source, config)
            }
        }
    }

    /// Honors `config.enabled` before resolving the store.
    pub fn from_config<F>(source: Arc<dyn ContentSource>, config: CacheConfig, resolve: F) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn CacheStore>, StoreError>,
    {
        if !config.enabled {
            info!("Content cache disabled by configuration");
            return Self::uncached(source, config);
        }
        Self::with_store_resolver(source, config, resolve)
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Router clearing the same store this service writes to.
    pub fn invalidation_router(&self) -> InvalidationRouter {
        InvalidationRouter::new(self.store.clone())
    }

    /// Single published item by slug. Absent items are not cached.
    #[instrument(skip(self, collection), fields(collection = %collection))]
    pub async fn get_published_single<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        slug: &str,
        locale: Option<&str>,
    ) -> Result<Option<T>, CmsError> {
        let key = detail_key(collection, slug, locale);
        if let Some(item) = self.lookup(collection, &key).await {
            return Ok(Some(item));
        }

        let Some(doc) = self
            .source
            .find_published_by_slug(collection, slug, locale)
            .await?
        else {
            debug!(%key, "Published item not found");
            return Ok(None);
        };

        let item = serde_json::from_value(doc.clone())?;
        self.write(
            collection,
            &key,
            doc,
            self.config.content_ttl,
            &detail_tags(collection),
        )
        .await;
        Ok(Some(item))
    }

    /// Published items of a collection. Only the `docs` array is cached,
    /// never the pagination envelope.
    #[instrument(skip(self, collection, options), fields(collection = %collection))]
    pub async fn list_published<T: DeserializeOwned>(
        &self,
        collection: &Collection,
        options: Option<&ListQueryOptions>,
    ) -> Result<Vec<T>, CmsError> {
        let options = options.cloned().unwrap_or_default();
        let locale = options.locale.as_deref();
        let options_digest = digest(Some(&options.without_locale()));
        let key = build_key(&collection.namespace(), locale, Some(&options_digest));

        if let Some(items) = self.lookup(collection, &key).await {
            return Ok(items);
        }

        let page = self.source.find_published(collection, &options).await?;
        let docs = Value::Array(page.docs);
        let items = serde_json::from_value(docs.clone())?;
        self.write(
            collection,
            &key,
            docs,
            self.config.list_ttl,
            &list_tags(collection, locale),
        )
        .await;
        Ok(items)
    }

    /// Categories with their nested detail items. An upstream response without
    /// categories is cached as an empty list.
    #[instrument(skip(self))]
    pub async fn list_grouped_with_children<T: DeserializeOwned>(
        &self,
        grouping: Grouping,
        locale: Option<&str>,
        category_slug: Option<&str>,
    ) -> Result<Vec<T>, CmsError> {
        let collection = grouping.collection();
        let key = build_key(
            &collection.namespace(),
            locale,
            Some(category_slug.unwrap_or(ALL_CATEGORIES)),
        );

        if let Some(groups) = self.lookup(&collection, &key).await {
            return Ok(groups);
        }

        let response = self
            .source
            .categories_with_children(grouping, locale, category_slug)
            .await?;
        let categories = Value::Array(response.into_categories());
        let groups = serde_json::from_value(categories.clone())?;
        self.write(
            &collection,
            &key,
            categories,
            self.config.list_ttl,
            &grouping_tags(grouping, locale),
        )
        .await;
        Ok(groups)
    }

    /// Cached value under `key`. Store failures, JSON null and entries that no
    /// longer decode all read as a miss.
    async fn lookup<T: DeserializeOwned>(&self, collection: &Collection, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;

        let cached = match store.get(key).await {
            Ok(cached) => cached.filter(|value| !value.is_null()),
            Err(err) => {
                warn!(%key, error = %err, "Cache read failed; fetching upstream");
                None
            }
        };

        let decoded = cached.and_then(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(%key, error = %err, "Cached entry no longer decodes; fetching upstream");
                None
            }
        });

        let label = collection.as_str().to_string();
        if decoded.is_some() {
            counter!(METRIC_CACHE_HIT, "collection" => label).increment(1);
            debug!(%key, "Content cache hit");
        } else {
            counter!(METRIC_CACHE_MISS, "collection" => label).increment(1);
            debug!(%key, "Content cache miss");
        }
        decoded
    }

    async fn write(
        &self,
        collection: &Collection,
        key: &str,
        data: Value,
        ttl: Duration,
        tags: &TagSet,
    ) {
        let Some(store) = &self.store else {
            return;
        };

        match store.set(key, data, ttl, tags).await {
            Ok(()) => {
                counter!(METRIC_CACHE_STORE, "collection" => collection.as_str().to_string())
                    .increment(1);
                debug!(%key, ttl_secs = ttl.as_secs(), ?tags, "Content cached");
            }
            Err(err) => {
                warn!(%key, error = %err, "Cache write failed; serving uncached result");
            }
        }
    }
}
