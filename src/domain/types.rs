//! CMS collection names known to the cache layer.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Collection {
    Pages,
    Articles,
    HeroCarousels,
    PageCategories,
    ArticleCategories,
    /// A collection this layer has no invalidation rules for.
    Other(String),
}

impl Collection {
    pub fn parse(value: &str) -> Self {
        match value {
            "pages" => Collection::Pages,
            "articles" => Collection::Articles,
            "hero-carousels" => Collection::HeroCarousels,
            "page-categories" => Collection::PageCategories,
            "article-categories" => Collection::ArticleCategories,
            other => Collection::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Collection::Pages => "pages",
            Collection::Articles => "articles",
            Collection::HeroCarousels => "hero-carousels",
            Collection::PageCategories => "page-categories",
            Collection::ArticleCategories => "article-categories",
            Collection::Other(name) => name.as_str(),
        }
    }

    /// Cache namespace, `cms:<collection>`.
    pub fn namespace(&self) -> String {
        format!("cms:{}", self.as_str())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Collection::parse(s))
    }
}

impl From<String> for Collection {
    fn from(value: String) -> Self {
        Collection::parse(&value)
    }
}

impl From<Collection> for String {
    fn from(value: Collection) -> Self {
        value.as_str().to_string()
    }
}

/// Category collections served together with their nested detail items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grouping {
    PageCategories,
    ArticleCategories,
}

impl Grouping {
    /// Collection the grouping is cached and invalidated under.
    pub fn collection(self) -> Collection {
        match self {
            Grouping::PageCategories => Collection::PageCategories,
            Grouping::ArticleCategories => Collection::ArticleCategories,
        }
    }

    /// Detail collection whose items are embedded in each group.
    pub fn detail(self) -> Collection {
        match self {
            Grouping::PageCategories => Collection::Pages,
            Grouping::ArticleCategories => Collection::Articles,
        }
    }

    /// Upstream endpoint under `/api/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            Grouping::PageCategories => "page-categories-with-pages",
            Grouping::ArticleCategories => "article-categories-with-articles",
        }
    }
}
