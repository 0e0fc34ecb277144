//! Cache configuration.
//!
//! Controls the content cache via the `[cache]` and `[cms]` sections of
//! `storefront-cms.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_CAPACITY: usize = 1000;
const DEFAULT_CONTENT_TTL_SECS: u64 = 300;
const DEFAULT_LIST_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache reads and writes at all. When false the facade always fetches.
    pub enabled: bool,
    /// Maximum entries held by the in-memory store.
    pub capacity: usize,
    /// TTL of single-item entries.
    pub content_ttl: Duration,
    /// TTL of list and category-grouping entries.
    pub list_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            content_ttl: Duration::from_secs(DEFAULT_CONTENT_TTL_SECS),
            list_ttl: Duration::from_secs(DEFAULT_LIST_TTL_SECS),
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        let defaults = Self::default();
        Self {
            enabled: settings.cache.enabled,
            capacity: settings.cache.capacity.get(),
            content_ttl: settings.cms.content_cache_ttl.unwrap_or(defaults.content_ttl),
            list_ttl: settings.cms.list_cache_ttl.unwrap_or(defaults.list_ttl),
        }
    }
}

impl CacheConfig {
    /// Returns the store capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
