//! Build a menu tree from a definition file.
//!
//! A definition lists categories and their items by page id; the builder
//! expands each item into a full Experience Builder page URL.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{MenuCategory, MenuLink, MenuTree};
use crate::error::{MenuError, MenuResult};

/// Menu definition file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuDefinition {
    /// Heading shown above the menu.
    #[serde(default)]
    pub menu_title: String,

    pub categories: Vec<CategoryDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    pub category_name: String,
    pub color: String,
    pub items: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub label: String,
    pub page_id: String,

    /// Extra search text; the label is used when empty.
    #[serde(default)]
    pub search_terms: String,
}

impl MenuDefinition {
    /// Read a definition from a JSON file.
    pub fn load(path: &Path) -> MenuResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MenuError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| MenuError::Definition {
            path: path.display().to_string(),
            details: e.to_string(),
        })
    }

    /// A starter definition to copy and edit.
    pub fn template() -> Self {
        Self {
            menu_title: "Your Custom Menu".to_string(),
            categories: vec![CategoryDefinition {
                category_name: "Example Category".to_string(),
                color: "btn-blue".to_string(),
                items: vec![ItemDefinition {
                    label: "Example Button".to_string(),
                    page_id: "Your-Page-ID".to_string(),
                    search_terms: "optional search terms".to_string(),
                }],
            }],
        }
    }
}

/// Full page URL: `{portal_url}/experience/{experience_id}/page/{page_id}`.
pub fn experience_url(portal_url: &str, experience_id: &str, page_id: &str) -> String {
    format!(
        "{}/experience/{experience_id}/page/{page_id}",
        portal_url.trim_end_matches('/')
    )
}

/// Expand a definition into a menu tree, keeping definition order.
///
/// Page URLs need the experience id, so a missing id is reported as the
/// missing `ARCGIS_BASE_EXPERIENCE_ID` setting.
pub fn build_tree(
    definition: &MenuDefinition,
    portal_url: &str,
    experience_id: Option<&str>,
) -> MenuResult<MenuTree> {
    let experience_id = experience_id
        .filter(|id| !id.is_empty())
        .ok_or(MenuError::MissingCredential {
            key: "ARCGIS_BASE_EXPERIENCE_ID",
        })?;

    let tree = definition
        .categories
        .iter()
        .map(|category| {
            let links = category
                .items
                .iter()
                .map(|item| {
                    MenuLink::new(
                        item.label.clone(),
                        experience_url(portal_url, experience_id, &item.page_id),
                        item.search_terms.clone(),
                    )
                })
                .collect();
            MenuCategory::new(category.category_name.clone(), category.color.clone(), links)
        })
        .collect();
    Ok(tree)
}
