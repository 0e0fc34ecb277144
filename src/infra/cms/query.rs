//! Query-string builder for the CMS filter syntax.
//!
//! Filters use nested bracket notation, e.g. `where[slug][equals]=home`.

use crate::domain::ListQueryOptions;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn push_opt(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.push(key, value),
            None => self,
        }
    }

    /// `where[<field>][equals]=<value>`
    pub fn where_equals(self, field: &str, value: impl Into<String>) -> Self {
        self.push(format!("where[{field}][equals]"), value)
    }

    pub fn published(self) -> Self {
        self.where_equals("status", "published")
    }

    pub fn limit(self, limit: u32) -> Self {
        self.push("limit", limit.to_string())
    }

    pub fn locale(self, locale: Option<&str>) -> Self {
        self.push_opt("locale", locale)
    }

    /// Appends every present list option; the category slug becomes a filter
    /// on the related category's slug.
    pub fn list_options(self, options: &ListQueryOptions) -> Self {
        let mut params = self
            .push_opt("limit", options.limit.map(|limit| limit.to_string()))
            .push_opt("page", options.page.map(|page| page.to_string()))
            .push_opt("sort", options.sort.as_deref());
        if let Some(slug) = options.category_slug.as_deref() {
            params = params.where_equals("category.slug", slug);
        }
        params.locale(options.locale.as_deref())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
