//! Deployment pipeline.
//!
//! A run moves through `Start -> BackedUp -> Validated -> Publishing -> Done`.
//! Backup failure only warns. Validation is the one hard gate: a structural
//! problem stops the run before either target is touched. The two publish
//! targets run one after the other and never gate each other; each outcome
//! is reported separately in the [`DeployReport`].

pub mod http;
pub mod vcs;

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, warn};

pub use http::HttpPublisher;
pub use vcs::{GitCli, VcsPublish, VersionControl, default_commit_message};

use crate::config::{Project, Settings};
use crate::error::{MenuResult, PublishError, PublishTarget, TreeViolation};
use crate::menu::artifact;

/// Pipeline progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeployStage {
    Start,
    BackedUp,
    Validated,
    Publishing,
    Done,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeployStage::Start => "start",
            DeployStage::BackedUp => "backed up",
            DeployStage::Validated => "validated",
            DeployStage::Publishing => "publishing",
            DeployStage::Done => "done",
        })
    }
}

/// Outcome of one publish target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The target accepted the artifact. `detail` is the commit message for
    /// VCS or the server's message for HTTP.
    Published { detail: Option<String> },
    /// Nothing to publish (clean working tree).
    Unchanged,
    /// Not attempted because validation failed.
    Skipped,
    Failed(PublishError),
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Published { .. } | TargetOutcome::Unchanged)
    }
}

/// Structured result of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Backup written before validation, if any.
    pub backup: Option<PathBuf>,

    /// Set when validation failed; both targets are then `Skipped`.
    pub validation: Option<TreeViolation>,

    pub vcs: TargetOutcome,
    pub http: TargetOutcome,

    /// Last stage reached.
    pub stage: DeployStage,
}

impl DeployReport {
    /// True only when validation passed and both targets succeeded.
    pub fn succeeded(&self) -> bool {
        self.validation.is_none() && self.vcs.is_success() && self.http.is_success()
    }

    /// Targets whose publish failed.
    pub fn failed_targets(&self) -> Vec<PublishTarget> {
        let mut failed = Vec::new();
        if matches!(self.vcs, TargetOutcome::Failed(_)) {
            failed.push(PublishTarget::Vcs);
        }
        if matches!(self.http, TargetOutcome::Failed(_)) {
            failed.push(PublishTarget::Http);
        }
        failed
    }

    /// Outcome of `target`.
    pub fn outcome(&self, target: PublishTarget) -> &TargetOutcome {
        match target {
            PublishTarget::Vcs => &self.vcs,
            PublishTarget::Http => &self.http,
        }
    }
}

/// Backs up, validates, and publishes a project's menu artifact.
pub struct DeploymentPipeline {
    menu_path: PathBuf,
    backup_dir: PathBuf,
    vcs: Box<dyn VersionControl>,
    http: HttpPublisher,
}

impl DeploymentPipeline {
    pub fn new(project: &Project, vcs: Box<dyn VersionControl>, http: HttpPublisher) -> Self {
        Self {
            menu_path: project.menu_path().to_path_buf(),
            backup_dir: project.backup_dir().to_path_buf(),
            vcs,
            http,
        }
    }

    /// Pipeline for `project` using git in the project root.
    ///
    /// Fails before any I/O when the publish endpoint is not configured.
    pub fn from_settings(project: &Project, settings: &Settings) -> MenuResult<Self> {
        let endpoint = settings.publish_endpoint()?;
        Ok(Self::new(
            project,
            Box::new(GitCli::new(project.root())),
            HttpPublisher::new(&endpoint),
        ))
    }

    /// Run the pipeline. `message` overrides the generated commit message.
    pub async fn run(&self, message: Option<&str>) -> DeployReport {
        let mut report = DeployReport {
            backup: None,
            validation: None,
            vcs: TargetOutcome::Skipped,
            http: TargetOutcome::Skipped,
            stage: DeployStage::Start,
        };

        match artifact::backup(&self.menu_path, &self.backup_dir).await {
            Ok(Some(path)) => report.backup = Some(path),
            Ok(None) => warn!(path = %self.menu_path.display(), "no menu artifact to back up"),
            Err(e) => {
                warn!(path = %self.menu_path.display(), error = %e, "backup failed, continuing")
            }
        }
        report.stage = DeployStage::BackedUp;

        if let Err(violation) = self.validate().await {
            error!(error = %violation, "menu validation failed, deployment aborted");
            report.validation = Some(violation);
            return report;
        }
        report.stage = DeployStage::Validated;
        info!("menu validation passed");

        report.stage = DeployStage::Publishing;

        let message = message
            .map(str::to_string)
            .unwrap_or_else(default_commit_message);
        report.vcs = match vcs::publish(self.vcs.as_ref(), &message).await {
            Ok(VcsPublish::Pushed) => TargetOutcome::Published {
                detail: Some(message),
            },
            Ok(VcsPublish::Unchanged) => TargetOutcome::Unchanged,
            Err(e) => {
                error!(error = %e, "vcs publish failed");
                TargetOutcome::Failed(e)
            }
        };

        report.http = match self.http.publish(&self.menu_path).await {
            Ok(detail) => TargetOutcome::Published { detail },
            Err(e) => {
                error!(error = %e, "http publish failed");
                TargetOutcome::Failed(e)
            }
        };

        report.stage = DeployStage::Done;
        info!(
            vcs_ok = report.vcs.is_success(),
            http_ok = report.http.is_success(),
            "deployment finished"
        );
        report
    }

    async fn validate(&self) -> Result<(), TreeViolation> {
        let content = tokio::fs::read_to_string(&self.menu_path)
            .await
            .map_err(|e| {
                TreeViolation::root(format!("cannot read {}: {e}", self.menu_path.display()))
            })?;
        artifact::parse(&content).map(drop)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn report(vcs: TargetOutcome, http: TargetOutcome) -> DeployReport {
        DeployReport {
            backup: None,
            validation: None,
            vcs,
            http,
            stage: DeployStage::Done,
        }
    }

    #[test]
    fn summary_distinguishes_partial_failure() {
        let ok = || TargetOutcome::Published { detail: None };
        let failed = |t: PublishTarget| {
            TargetOutcome::Failed(match t {
                PublishTarget::Vcs => PublishError::vcs("git push", "rejected"),
                PublishTarget::Http => PublishError::http("POST /menu", "500"),
            })
        };

        assert!(report(ok(), TargetOutcome::Unchanged).succeeded());

        let one = report(failed(PublishTarget::Vcs), ok());
        assert!(!one.succeeded());
        assert_eq!(one.failed_targets(), [PublishTarget::Vcs]);
        assert!(one.outcome(PublishTarget::Http).is_success());
        assert_eq!(one.outcome(PublishTarget::Vcs), &failed(PublishTarget::Vcs));

        let both = report(failed(PublishTarget::Vcs), failed(PublishTarget::Http));
        assert_eq!(both.failed_targets(), [PublishTarget::Vcs, PublishTarget::Http]);
    }

    #[test]
    fn validation_failure_is_not_success() {
        let mut r = report(TargetOutcome::Skipped, TargetOutcome::Skipped);
        r.validation = Some(TreeViolation::category(0, "missing required field: links"));
        assert!(!r.succeeded());
        assert!(r.failed_targets().is_empty());
    }

    #[test]
    fn from_settings_requires_publish_endpoint() {
        let settings = Settings::from_pairs([("MENU_API_BASE_URL", "https://m")]).unwrap();
        let err = DeploymentPipeline::from_settings(&Project::new("/tmp/p"), &settings).err();
        assert!(matches!(
            err,
            Some(crate::error::MenuError::MissingCredential {
                key: "MENU_API_PASSWORD"
            })
        ));
    }
}
