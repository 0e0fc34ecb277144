//! Cache key derivation.
//!
//! Keys are plain strings shared with any external store:
//! `<namespace>:<locale|default>:<digest|slug|default>` for lists and
//! groupings, `cms:<collection>:<slug>:<locale|default>` for detail entries.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::{Collection, ListQueryOptions};

/// Segment used for an absent locale, slug or option bag.
pub const DEFAULT_SEGMENT: &str = "default";

/// Digest of a list option bag.
///
/// `None` and a bag with no field set both collapse to `"default"`. Otherwise
/// the present fields are serialized with sorted keys and hashed with SHA-256,
/// so the digest never depends on the order fields were assigned.
pub fn digest(options: Option<&ListQueryOptions>) -> String {
    let Some(options) = options.filter(|options| !options.is_empty()) else {
        return DEFAULT_SEGMENT.to_string();
    };

    let mut hasher = Sha256::new();
    hasher.update(canonical_options(options).as_bytes());
    hex::encode(hasher.finalize())
}

/// `namespace:locale:discriminator`, substituting `"default"` for absent parts.
pub fn build_key(namespace: &str, locale: Option<&str>, discriminator: Option<&str>) -> String {
    format!(
        "{namespace}:{}:{}",
        locale.unwrap_or(DEFAULT_SEGMENT),
        discriminator.unwrap_or(DEFAULT_SEGMENT)
    )
}

/// Key of a single published item; the invalidation router clears this exact key.
pub fn detail_key(collection: &Collection, slug: &str, locale: Option<&str>) -> String {
    format!(
        "{}:{slug}:{}",
        collection.namespace(),
        locale.unwrap_or(DEFAULT_SEGMENT)
    )
}

fn canonical_options(options: &ListQueryOptions) -> String {
    // Inserted in lexical key order so output is identical with or without
    // serde_json's `preserve_order`.
    let mut fields = Map::new();
    if let Some(slug) = &options.category_slug {
        fields.insert("categorySlug".into(), Value::from(slug.as_str()));
    }
    if let Some(limit) = options.limit {
        fields.insert("limit".into(), Value::from(limit.get()));
    }
    if let Some(locale) = &options.locale {
        fields.insert("locale".into(), Value::from(locale.as_str()));
    }
    if let Some(page) = options.page {
        fields.insert("page".into(), Value::from(page.get()));
    }
    if let Some(sort) = &options.sort {
        fields.insert("sort".into(), Value::from(sort.as_str()));
    }
    Value::Object(fields).to_string()
}
