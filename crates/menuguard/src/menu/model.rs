//! Menu tree data model.
//!
//! The tree is two levels deep: ordered categories, each holding ordered
//! links. Unknown keys on categories and links are carried through
//! untouched and written after the known keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker that precedes a page key in a platform page URL.
pub const PAGE_MARKER: &str = "/page/";

/// A navigation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuLink {
    /// Button text.
    pub label: String,

    /// Destination URL; platform pages end in `/page/<key>`.
    pub href: String,

    /// Free-text search token.
    pub term: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MenuLink {
    /// Create a link. An empty `term` falls back to the label.
    pub fn new(label: impl Into<String>, href: impl Into<String>, term: impl Into<String>) -> Self {
        let label = label.into();
        let term = term.into();
        let term = if term.is_empty() { label.clone() } else { term };
        Self {
            label,
            href: href.into(),
            term,
            extra: Map::new(),
        }
    }

    /// The page key embedded in the href, if the href carries the page marker.
    ///
    /// The key is everything after the last marker, so it may be empty.
    pub fn page_key(&self) -> Option<&str> {
        self.href
            .rfind(PAGE_MARKER)
            .map(|idx| &self.href[idx + PAGE_MARKER.len()..])
    }
}

/// A named, colour-tagged group of links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCategory {
    /// Display name.
    pub category: String,

    /// Style tag (e.g. `btn-purple`).
    pub color: String,

    pub links: Vec<MenuLink>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MenuCategory {
    pub fn new(
        category: impl Into<String>,
        color: impl Into<String>,
        links: Vec<MenuLink>,
    ) -> Self {
        Self {
            category: category.into(),
            color: color.into(),
            links,
            extra: Map::new(),
        }
    }
}

/// The menu artifact: an ordered sequence of categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuTree(pub Vec<MenuCategory>);

impl MenuTree {
    pub fn new(categories: Vec<MenuCategory>) -> Self {
        Self(categories)
    }

    pub fn categories(&self) -> &[MenuCategory] {
        &self.0
    }

    pub fn into_categories(self) -> Vec<MenuCategory> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total links across all categories.
    pub fn link_count(&self) -> usize {
        self.0.iter().map(|c| c.links.len()).sum()
    }
}

impl FromIterator<MenuCategory> for MenuTree {
    fn from_iter<I: IntoIterator<Item = MenuCategory>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
