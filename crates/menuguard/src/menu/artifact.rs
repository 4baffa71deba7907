//! Menu artifact persistence and structural validation.
//!
//! The artifact is a JSON array of `{category, color, links}` objects, each
//! link a `{label, href, term}` object. It is written pretty-printed with
//! two-space indentation and no trailing newline, so saving a tree that was
//! loaded unchanged reproduces the same bytes.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use super::model::MenuTree;
use crate::error::{MenuError, MenuResult, TreeViolation};

const CATEGORY_FIELDS: [&str; 3] = ["category", "color", "links"];
const LINK_FIELDS: [&str; 3] = ["label", "href", "term"];

/// Check the structure of a parsed artifact and convert it to a tree.
///
/// The first violation found is returned, located by category and link
/// index.
pub fn validate(value: &Value) -> Result<MenuTree, TreeViolation> {
    let Some(categories) = value.as_array() else {
        return Err(TreeViolation::root("menu must be a list of categories"));
    };

    for (i, category) in categories.iter().enumerate() {
        let Some(category) = category.as_object() else {
            return Err(TreeViolation::category(i, "category must be an object"));
        };

        for field in CATEGORY_FIELDS {
            if !category.contains_key(field) {
                return Err(TreeViolation::category(
                    i,
                    format!("missing required field: {field}"),
                ));
            }
        }

        for field in ["category", "color"] {
            if !category[field].is_string() {
                return Err(TreeViolation::category(i, format!("{field} must be a string")));
            }
        }

        let Some(links) = category["links"].as_array() else {
            return Err(TreeViolation::category(i, "links must be a list"));
        };

        for (j, link) in links.iter().enumerate() {
            let Some(link) = link.as_object() else {
                return Err(TreeViolation::link(i, j, "link must be an object"));
            };
            for field in LINK_FIELDS {
                match link.get(field) {
                    None => {
                        return Err(TreeViolation::link(i, j, format!("missing field: {field}")));
                    }
                    Some(v) if !v.is_string() => {
                        return Err(TreeViolation::link(i, j, format!("{field} must be a string")));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    serde_json::from_value(value.clone()).map_err(|e| TreeViolation::root(e.to_string()))
}

/// Parse artifact text and validate it.
pub fn parse(content: &str) -> Result<MenuTree, TreeViolation> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| TreeViolation::root(format!("invalid JSON: {e}")))?;
    validate(&value)
}

/// Read and validate the artifact at `path`.
pub async fn load(path: &Path) -> MenuResult<MenuTree> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| MenuError::io(path, e))?;
    let tree = parse(&content)?;
    debug!(path = %path.display(), categories = tree.len(), "menu loaded");
    Ok(tree)
}

/// Serialize a tree in artifact form. Non-ASCII text is written as raw
/// UTF-8, so a file using `\uXXXX` escapes changes once on its first save.
pub fn to_json(tree: &MenuTree) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tree)
}

/// Write the tree to `path` via a temporary sibling and a rename, so a
/// reader never sees a partially written artifact.
pub async fn save(path: &Path, tree: &MenuTree) -> MenuResult<()> {
    let json = to_json(tree).map_err(|e| MenuError::io(path, e.into()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "menu.json".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, json.as_bytes())
        .await
        .map_err(|e| MenuError::io(&tmp, e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| MenuError::io(path, e))?;

    info!(path = %path.display(), categories = tree.len(), links = tree.link_count(), "menu saved");
    Ok(())
}

/// Copy the artifact into `dir` under a timestamped name
/// (`menu.json` -> `menu_backup_20250101_120000.json`).
///
/// Returns `None` when there is no artifact to back up.
pub async fn backup(path: &Path, dir: &Path) -> std::io::Result<Option<PathBuf>> {
    if !fs::try_exists(path).await? {
        return Ok(None);
    }

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let target = backup_path(path, dir, &stamp, |candidate| candidate.exists());

    fs::copy(path, &target).await?;
    info!(backup = %target.display(), "menu backup created");
    Ok(Some(target))
}

/// Pick a backup path for `stamp`, adding a counter if that name is taken.
fn backup_path(path: &Path, dir: &Path, stamp: &str, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "menu".to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = dir.join(format!("{stem}_backup_{stamp}{ext}"));
    let mut n = 1;
    while taken(&candidate) {
        candidate = dir.join(format!("{stem}_backup_{stamp}_{n}{ext}"));
        n += 1;
    }
    candidate
}
