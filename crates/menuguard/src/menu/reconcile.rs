//! Prune a menu tree down to links that point at visible pages.

use tracing::{debug, info};

use super::model::{MenuCategory, MenuTree};
use crate::visibility::PageSet;

/// A link dropped because its page is not visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedLink {
    pub category: String,
    pub label: String,
    pub page_key: String,
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// The pruned tree. No category in it is empty.
    pub tree: MenuTree,

    /// Links removed, in tree order.
    pub removed: Vec<RemovedLink>,

    /// Categories dropped because no link survived.
    pub dropped_categories: Vec<String>,
}

impl Reconciliation {
    /// True when nothing had to be removed.
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty() && self.dropped_categories.is_empty()
    }
}

/// Keep links whose embedded page key is visible, plus every link without
/// a page key; then drop categories left with no links.
///
/// Order of categories and of links within a category is preserved.
pub fn reconcile(tree: MenuTree, visible: &PageSet) -> Reconciliation {
    let mut removed = Vec::new();
    let mut dropped_categories = Vec::new();
    let mut kept = Vec::with_capacity(tree.len());

    for category in tree.into_categories() {
        let MenuCategory {
            category: name,
            color,
            links,
            extra,
        } = category;

        let mut surviving = Vec::with_capacity(links.len());
        for link in links {
            match link.page_key() {
                Some(key) if !visible.contains_key(key) => {
                    debug!(
                        category = %name,
                        label = %link.label,
                        page = %key,
                        "removing link to hidden page"
                    );
                    removed.push(RemovedLink {
                        category: name.clone(),
                        label: link.label.clone(),
                        page_key: key.to_string(),
                    });
                }
                _ => surviving.push(link),
            }
        }

        if surviving.is_empty() {
            dropped_categories.push(name);
            continue;
        }

        kept.push(MenuCategory {
            category: name,
            color,
            links: surviving,
            extra,
        });
    }

    if removed.is_empty() {
        debug!("all menu links point at visible pages");
    } else {
        info!(
            removed = removed.len(),
            dropped_categories = dropped_categories.len(),
            "removed links to hidden pages"
        );
    }

    Reconciliation {
        tree: MenuTree::new(kept),
        removed,
        dropped_categories,
    }
}
