//! Workflows that combine page classification with the menu artifact.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::{Project, Settings};
use crate::error::{MenuError, MenuResult};
use crate::menu::{
    MenuDefinition, MenuTree, Reconciliation, RemovedLink, artifact, build_tree, reconcile,
};
use crate::platform::PlatformClient;
use crate::visibility::{self, Classification, VisibilityRules};

/// Links in `tree` that point at pages outside the visible set.
/// The tree itself is not modified.
pub fn audit(tree: &MenuTree, classification: &Classification) -> Vec<RemovedLink> {
    reconcile(tree.clone(), &classification.visible).removed
}

/// Classify the configured application's pages.
///
/// Returns `None` when no application id is configured. A failed page
/// fetch degrades to an empty classification; token and credential
/// problems are returned as errors.
pub async fn visible_pages(
    client: &PlatformClient,
    settings: &Settings,
    rules: &VisibilityRules,
) -> MenuResult<Option<Classification>> {
    if settings.app_id.is_none() {
        warn!("ARCGIS_BASE_EXPERIENCE_ID not configured, skipping visibility check");
        return Ok(None);
    }
    let credentials = settings.credentials()?;

    match visibility::classify(client, &credentials, rules).await {
        Ok(classification) => Ok(Some(classification)),
        Err(e @ MenuError::Fetch { .. }) => {
            warn!(error = %e, "page fetch failed, treating every page as hidden");
            Ok(Some(Classification::empty()))
        }
        Err(e) => Err(e),
    }
}

/// Reconcile `tree` against the current visible pages.
///
/// When no application id is configured the tree comes back unchanged.
pub async fn refresh_visibility(
    client: &PlatformClient,
    settings: &Settings,
    rules: &VisibilityRules,
    tree: MenuTree,
) -> MenuResult<Reconciliation> {
    match visible_pages(client, settings, rules).await? {
        Some(classification) => Ok(reconcile(tree, &classification.visible)),
        None => Ok(unchanged(tree)),
    }
}

/// Result of rewriting the project's artifact.
#[derive(Debug, Clone)]
pub struct ArtifactUpdate {
    /// Backup of the previous artifact, if one existed and could be copied.
    pub backup: Option<PathBuf>,
    pub reconciliation: Reconciliation,
}

/// Back up, load, reconcile, and atomically rewrite the project's artifact.
pub async fn reconcile_artifact(
    project: &Project,
    client: &PlatformClient,
    settings: &Settings,
    rules: &VisibilityRules,
) -> MenuResult<ArtifactUpdate> {
    let backup = backup_quietly(project).await;
    let tree = artifact::load(project.menu_path()).await?;
    let reconciliation = refresh_visibility(client, settings, rules, tree).await?;
    artifact::save(project.menu_path(), &reconciliation.tree).await?;

    info!(
        removed = reconciliation.removed.len(),
        categories = reconciliation.tree.len(),
        "menu reconciled"
    );
    Ok(ArtifactUpdate {
        backup,
        reconciliation,
    })
}

/// Build the project's artifact from a menu definition.
///
/// Unless `skip_visibility` is set, links to hidden pages are pruned
/// before the artifact is written. An existing artifact is backed up first.
pub async fn generate(
    project: &Project,
    definition: &MenuDefinition,
    client: &PlatformClient,
    settings: &Settings,
    rules: &VisibilityRules,
    skip_visibility: bool,
) -> MenuResult<ArtifactUpdate> {
    let tree = build_tree(definition, &settings.portal_url, settings.app_id.as_deref())?;
    info!(
        title = %definition.menu_title,
        categories = tree.len(),
        links = tree.link_count(),
        "menu built from definition"
    );

    let reconciliation = if skip_visibility {
        unchanged(tree)
    } else {
        refresh_visibility(client, settings, rules, tree).await?
    };

    let backup = backup_quietly(project).await;
    artifact::save(project.menu_path(), &reconciliation.tree).await?;

    Ok(ArtifactUpdate {
        backup,
        reconciliation,
    })
}

fn unchanged(tree: MenuTree) -> Reconciliation {
    Reconciliation {
        tree,
        removed: Vec::new(),
        dropped_categories: Vec::new(),
    }
}

async fn backup_quietly(project: &Project) -> Option<PathBuf> {
    match artifact::backup(project.menu_path(), project.backup_dir()).await {
        Ok(path) => path,
        Err(e) => {
            warn!(
                path = %project.menu_path().display(),
                error = %e,
                "backup failed, continuing"
            );
            None
        }
    }
}
