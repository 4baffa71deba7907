//! Version-control publish target.
//!
//! The pipeline talks to a [`VersionControl`] backend; [`GitCli`] drives the
//! `git` binary in the project directory.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::PublishError;

/// Default limit for a single git command.
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Commit message used when the caller does not supply one.
pub fn default_commit_message() -> String {
    format!(
        "Update ArcGIS Experience Builder menu - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    )
}

/// Result of a VCS publish that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsPublish {
    /// Nothing to commit.
    Unchanged,
    /// Changes were committed and pushed.
    Pushed,
}

/// Version-control backend.
///
/// Each step is a separate call so the pipeline can report which one
/// failed. Errors carry the failing command and its stderr.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Porcelain listing of uncommitted changes; empty when clean.
    async fn pending_changes(&self) -> Result<String, PublishError>;

    /// Stage every change in the working tree.
    async fn stage_all(&self) -> Result<(), PublishError>;

    /// Commit staged changes.
    async fn commit(&self, message: &str) -> Result<(), PublishError>;

    /// Push to the configured remote.
    async fn push(&self) -> Result<(), PublishError>;
}

/// Run the VCS publish sequence: skip when clean, otherwise stage, commit,
/// and push, stopping at the first failing step.
///
/// A failing status check counts as a clean tree; only stage, commit, and
/// push can fail the target.
pub async fn publish(vcs: &dyn VersionControl, message: &str) -> Result<VcsPublish, PublishError> {
    let changes = match vcs.pending_changes().await {
        Ok(changes) => changes,
        Err(e) => {
            warn!(error = %e, "cannot read working tree status, nothing to commit");
            return Ok(VcsPublish::Unchanged);
        }
    };
    if changes.trim().is_empty() {
        info!("no changes to commit");
        return Ok(VcsPublish::Unchanged);
    }
    debug!(changes = %changes.trim_end(), "changes detected");

    vcs.stage_all().await?;
    vcs.commit(message).await?;
    vcs.push().await?;

    info!(message = %message, "changes pushed");
    Ok(VcsPublish::Pushed)
}

/// [`VersionControl`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    /// Run git in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Run `git <args>` and return stdout. Non-zero exit, spawn failure,
    /// and timeout are all publish errors at step `git <args>`.
    async fn run(&self, args: &[&str]) -> Result<String, PublishError> {
        let step = format!("git {}", args.join(" "));
        debug!(dir = %self.dir.display(), command = %step, "running git");

        let output = tokio::time::timeout(
            GIT_COMMAND_TIMEOUT,
            tokio::process::Command::new("git")
                .args(args)
                .current_dir(&self.dir)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| PublishError::vcs(&step, format!("timed out after {GIT_COMMAND_TIMEOUT:?}")))?
        .map_err(|e| PublishError::vcs(&step, format!("failed to execute git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let details = match (stderr.trim(), stdout.trim()) {
                ("", "") => format!("exited with {}", output.status),
                ("", out) => out.to_string(),
                (err, _) => err.to_string(),
            };
            return Err(PublishError::vcs(&step, details));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn pending_changes(&self) -> Result<String, PublishError> {
        self.run(&["status", "--porcelain"]).await
    }

    async fn stage_all(&self) -> Result<(), PublishError> {
        self.run(&["add", "."]).await.map(drop)
    }

    async fn commit(&self, message: &str) -> Result<(), PublishError> {
        self.run(&["commit", "-m", message]).await.map(drop)
    }

    async fn push(&self) -> Result<(), PublishError> {
        self.run(&["push"]).await.map(drop)
    }
}
