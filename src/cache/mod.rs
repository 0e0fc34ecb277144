//! Content cache.
//!
//! Keys, tags and the store contract used by the content service, plus the
//! webhook invalidation router:
//!
//! - **keys**: deterministic keys from namespace, locale and list options
//! - **tags**: coarse labels attached to entries for bulk invalidation
//! - **store**: the `CacheStore` contract and an in-memory implementation
//! - **invalidation**: maps `(collection, slug, locale)` to keys and tags
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1000
//!
//! [cms]
//! content_cache_ttl = 300
//! list_cache_ttl = 60
//! ```

mod config;
mod invalidation;
mod keys;
mod lock;
mod store;
mod tags;

pub use config::CacheConfig;
pub use invalidation::{InvalidationPlan, InvalidationRouter, compute_invalidation};
pub use keys::{DEFAULT_SEGMENT, build_key, detail_key, digest};
pub use store::{CacheStore, ClearTarget, MemoryCacheStore, StoreError};
pub use tags::{
    ROOT_TAG, TagSet, collection_tag, detail_tags, grouping_tags, list_tags, locale_tag,
    normalize_locale,
};

#[cfg(test)]
pub(crate) use store::testing;
