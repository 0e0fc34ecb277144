//! Cache store contract and the bundled in-memory implementation.
//!
//! The content layer only needs three operations: `get`, `set` with a TTL and
//! tags, and `clear` by key or by tags. Anything satisfying [`CacheStore`]
//! (an in-process map, Redis, ...) can back it.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use thiserror::Error;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};
use super::tags::TagSet;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT: &str = "cms_cache_evict_total";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// What a `clear` call removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearTarget {
    /// A single entry by exact key.
    Key(String),
    /// Every entry carrying at least one of the tags.
    Tags(Vec<String>),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `data`, replacing any previous entry and its tags.
    async fn set(
        &self,
        key: &str,
        data: Value,
        ttl: Duration,
        tags: &TagSet,
    ) -> Result<(), StoreError>;

    async fn clear(&self, target: ClearTarget) -> Result<(), StoreError>;
}

struct Entry {
    data: Value,
    expires_at: Option<Instant>,
    tags: TagSet,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local store with LRU eviction, per-entry expiry and a tag index.
///
/// Lock order is always `entries` then `tag_index`.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, Entry>>,
    tag_index: RwLock<HashMap<String, HashSet<String>>>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            tag_index: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries, including expired ones not yet collected.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unlink(index: &mut HashMap<String, HashSet<String>>, key: &str, tags: &TagSet) {
        for tag in tags {
            if let Some(keys) = index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    index.remove(tag);
                }
            }
        }
    }

    fn remove_key(&self, key: &str) -> bool {
        let mut entries = rw_write(&self.entries, SOURCE, "remove_key.entries");
        let Some(entry) = entries.pop(key) else {
            return false;
        };
        let mut index = rw_write(&self.tag_index, SOURCE, "remove_key.tag_index");
        Self::unlink(&mut index, key, &entry.tags);
        true
    }

    fn remove_tags(&self, tags: &[String]) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "remove_tags.entries");
        let mut index = rw_write(&self.tag_index, SOURCE, "remove_tags.tag_index");

        let keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| index.remove(tag))
            .flatten()
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.pop(&key) {
                Self::unlink(&mut index, &key, &entry.tags);
                removed += 1;
            }
        }
        removed
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.data.clone())),
            Some(_) => true,
            None => false,
        };

        if expired && let Some(stale) = entries.pop(key) {
            let mut index = rw_write(&self.tag_index, SOURCE, "get.expire");
            Self::unlink(&mut index, key, &stale.tags);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        data: Value,
        ttl: Duration,
        tags: &TagSet,
    ) -> Result<(), StoreError> {
        let entry = Entry {
            data,
            expires_at: Instant::now().checked_add(ttl),
            tags: tags.clone(),
        };

        let mut entries = rw_write(&self.entries, SOURCE, "set.entries");
        let displaced = entries.push(key.to_string(), entry);
        let mut index = rw_write(&self.tag_index, SOURCE, "set.tag_index");

        if let Some((old_key, old_entry)) = displaced {
            Self::unlink(&mut index, &old_key, &old_entry.tags);
            if old_key != key {
                counter!(METRIC_CACHE_EVICT).increment(1);
            }
        }
        for tag in tags {
            index.entry(tag.clone()).or_default().insert(key.to_string());
        }
        Ok(())
    }

    async fn clear(&self, target: ClearTarget) -> Result<(), StoreError> {
        match target {
            ClearTarget::Key(key) => {
                self.remove_key(&key);
            }
            ClearTarget::Tags(tags) => {
                self.remove_tags(&tags);
            }
        }
        Ok(())
    }
}
