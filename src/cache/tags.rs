//! Invalidation tags attached to cache entries.

use std::collections::BTreeSet;

use crate::domain::{Collection, Grouping};

/// Tag carried by every entry this layer writes.
pub const ROOT_TAG: &str = "cms";

pub type TagSet = BTreeSet<String>;

/// Treats an absent locale and the string `"null"` alike.
///
/// Webhook payloads stringify a missing locale to `"null"`; reading it as
/// "no locale" widens invalidation to every locale of the collection.
pub fn normalize_locale(locale: Option<&str>) -> Option<&str> {
    locale.filter(|value| *value != "null")
}

/// `cms:<collection>`
pub fn collection_tag(collection: &Collection) -> String {
    collection.namespace()
}

/// `cms:<collection>:locale:<locale>`
pub fn locale_tag(collection: &Collection, locale: &str) -> String {
    format!("{}:locale:{locale}", collection.namespace())
}

/// Tags of a cached detail item: `cms` and `cms:<collection>`.
pub fn detail_tags(collection: &Collection) -> TagSet {
    TagSet::from([ROOT_TAG.to_string(), collection_tag(collection)])
}

/// Tags of a cached list: detail tags plus the locale tag when a real locale is given.
pub fn list_tags(collection: &Collection, locale: Option<&str>) -> TagSet {
    let mut tags = detail_tags(collection);
    if let Some(locale) = normalize_locale(locale) {
        tags.insert(locale_tag(collection, locale));
    }
    tags
}

/// Tags of a cached grouping: list tags of the grouping collection plus the
/// locale tag of the detail collection embedded in it.
pub fn grouping_tags(grouping: Grouping, locale: Option<&str>) -> TagSet {
    let mut tags = list_tags(&grouping.collection(), locale);
    if let Some(locale) = normalize_locale(locale) {
        tags.insert(locale_tag(&grouping.detail(), locale));
    }
    tags
}
