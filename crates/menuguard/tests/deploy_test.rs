#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Deployment pipeline: validation gate and independent publish targets.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use menuguard::deploy::{
    DeployStage, DeploymentPipeline, HttpPublisher, TargetOutcome, VersionControl,
};
use menuguard::{Project, PublishError, PublishTarget, Settings};
use menuguard_test_utils::{
    MENU_API_PASSWORD, MockPlatform, TestProject, assert, menu_json, test_category,
};
use serde_json::json;

/// Scripted version control that records the commands it was asked to run.
#[derive(Clone, Default)]
struct FakeVcs {
    changes: String,
    reject_push: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakeVcs {
    fn dirty() -> Self {
        Self {
            changes: " M menu.json\n".into(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn pending_changes(&self) -> Result<String, PublishError> {
        self.log.lock().unwrap().push("status".into());
        Ok(self.changes.clone())
    }

    async fn stage_all(&self) -> Result<(), PublishError> {
        self.log.lock().unwrap().push("add".into());
        Ok(())
    }

    async fn commit(&self, message: &str) -> Result<(), PublishError> {
        self.log.lock().unwrap().push(format!("commit {message}"));
        Ok(())
    }

    async fn push(&self) -> Result<(), PublishError> {
        self.log.lock().unwrap().push("push".into());
        if self.reject_push {
            return Err(PublishError::vcs(
                "git push",
                "! [rejected] main -> main (fetch first)",
            ));
        }
        Ok(())
    }
}

fn valid_menu() -> serde_json::Value {
    menu_json(&[
        test_category("1 Situation Summary", "btn-purple").with_page_link("National", "page_84"),
    ])
}

fn pipeline(dir: &TestProject, platform: &MockPlatform, vcs: FakeVcs) -> DeploymentPipeline {
    let settings = Settings::from_pairs(platform.store_pairs()).unwrap();
    pipeline_for(&Project::new(dir.root()), &settings, vcs)
}

fn pipeline_for(project: &Project, settings: &Settings, vcs: FakeVcs) -> DeploymentPipeline {
    let endpoint = settings.publish_endpoint().unwrap();
    DeploymentPipeline::new(project, Box::new(vcs), HttpPublisher::new(&endpoint))
}

#[tokio::test]
async fn test_both_targets_succeed() {
    let platform = MockPlatform::start().await;
    platform
        .mount_menu_api(200, json!({ "message": "Menu updated" }))
        .await;
    let project = TestProject::new();
    project.write_menu(&valid_menu());
    let vcs = FakeVcs::dirty();

    let report = pipeline(&project, &platform, vcs.clone())
        .run(Some("Prune hidden pages"))
        .await;

    assert!(report.succeeded());
    assert_eq!(report.stage, DeployStage::Done);
    assert!(report.backup.is_some());
    assert_eq!(
        report.vcs,
        TargetOutcome::Published {
            detail: Some("Prune hidden pages".into())
        }
    );
    assert_eq!(
        report.http,
        TargetOutcome::Published {
            detail: Some("Menu updated".into())
        }
    );
    assert_eq!(vcs.calls(), ["status", "add", "commit Prune hidden pages", "push"]);
}

#[tokio::test]
async fn test_push_rejected_does_not_block_http() {
    let platform = MockPlatform::start().await;
    platform.mount_menu_api(200, json!({ "status": "ok" })).await;
    let project = TestProject::new();
    project.write_menu(&valid_menu());
    let vcs = FakeVcs {
        reject_push: true,
        ..FakeVcs::dirty()
    };

    let report = pipeline(&project, &platform, vcs).run(None).await;

    assert!(!report.succeeded());
    assert_eq!(report.failed_targets(), [PublishTarget::Vcs]);
    assert!(report.http.is_success());
    match &report.vcs {
        TargetOutcome::Failed(e) => {
            assert_eq!(e.step, "git push");
            assert!(e.details.contains("rejected"));
        }
        other => panic!("expected vcs failure, got {other:?}"),
    }
    assert_eq!(platform.requests_to("/menu").await, 1);
}

#[tokio::test]
async fn test_http_failure_with_clean_tree() {
    let platform = MockPlatform::start().await;
    platform
        .mount_menu_api(401, json!({ "error": "bad password" }))
        .await;
    let project = TestProject::new();
    project.write_menu(&valid_menu());
    let vcs = FakeVcs::default();

    let report = pipeline(&project, &platform, vcs.clone()).run(None).await;

    assert_eq!(report.vcs, TargetOutcome::Unchanged);
    assert_eq!(report.failed_targets(), [PublishTarget::Http]);
    assert_eq!(vcs.calls(), ["status"]);
    let TargetOutcome::Failed(e) = &report.http else {
        panic!("expected http failure");
    };
    assert!(e.details.contains("401"));
    assert!(e.details.contains("bad password"));
}

#[tokio::test]
async fn test_invalid_artifact_skips_both_targets() {
    let platform = MockPlatform::start().await;
    platform.mount_menu_api(200, json!({})).await;
    let project = TestProject::new();
    project.write_menu(&json!([
        { "category": "A", "color": "btn-blue", "links": [] },
        { "category": "B", "color": "btn-red" }
    ]));
    let vcs = FakeVcs::dirty();

    let report = pipeline(&project, &platform, vcs.clone()).run(None).await;

    assert!(!report.succeeded());
    assert_eq!(report.stage, DeployStage::BackedUp);
    let violation = report.validation.as_ref().unwrap();
    assert_eq!(violation.category, Some(1));
    assert!(violation.reason.contains("links"));
    assert_eq!(report.vcs, TargetOutcome::Skipped);
    assert_eq!(report.http, TargetOutcome::Skipped);
    assert!(report.failed_targets().is_empty());
    assert!(vcs.calls().is_empty());
    assert_eq!(platform.requests_to("/menu").await, 0);
    assert_eq!(project.backups().len(), 1);
}

#[tokio::test]
async fn test_missing_artifact_fails_validation() {
    let platform = MockPlatform::start().await;
    let project = TestProject::new();

    let report = pipeline(&project, &platform, FakeVcs::dirty()).run(None).await;

    assert!(report.backup.is_none());
    assert!(report.validation.unwrap().reason.contains("cannot read"));
}

#[tokio::test]
async fn test_backup_failure_does_not_block_publish() {
    let platform = MockPlatform::start().await;
    platform
        .mount_menu_api(200, json!({ "message": "Menu updated" }))
        .await;
    let dir = TestProject::new();
    dir.write_menu(&valid_menu());
    // A regular file where the backup directory should be.
    let blocker = dir.root().join("backups");
    std::fs::write(&blocker, "").unwrap();
    let project = Project::new(dir.root()).with_backup_dir(&blocker);
    let settings = Settings::from_pairs(platform.store_pairs()).unwrap();
    let vcs = FakeVcs::dirty();

    let report = pipeline_for(&project, &settings, vcs.clone()).run(None).await;

    assert!(report.backup.is_none());
    assert!(dir.backups().is_empty());
    assert!(report.succeeded());
    assert_eq!(report.stage, DeployStage::Done);
    assert!(matches!(
        report.outcome(PublishTarget::Vcs),
        TargetOutcome::Published { .. }
    ));
    assert!(report.outcome(PublishTarget::Http).is_success());
    assert_eq!(vcs.calls().last().map(String::as_str), Some("push"));
    assert_eq!(platform.requests_to("/menu").await, 1);
}

#[tokio::test]
async fn test_unreachable_menu_api_does_not_block_vcs() {
    let platform = MockPlatform::start().await;
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = TestProject::new();
    dir.write_menu(&valid_menu());
    let mut pairs = platform.store_pairs();
    pairs.push((
        "MENU_API_BASE_URL".into(),
        format!("http://127.0.0.1:{closed_port}"),
    ));
    let settings = Settings::from_pairs(pairs).unwrap();
    let vcs = FakeVcs::dirty();

    let report = pipeline_for(&Project::new(dir.root()), &settings, vcs.clone())
        .run(Some("Update menu"))
        .await;

    assert!(!report.succeeded());
    assert_eq!(report.failed_targets(), [PublishTarget::Http]);
    assert_eq!(
        report.vcs,
        TargetOutcome::Published {
            detail: Some("Update menu".into())
        }
    );
    assert_eq!(vcs.calls(), ["status", "add", "commit Update menu", "push"]);
    let TargetOutcome::Failed(e) = report.outcome(PublishTarget::Http) else {
        panic!("expected http failure");
    };
    assert_eq!(e.step, "POST /menu");
    assert::contains(&e.details, "network error");
    assert::not_contains(&e.details, MENU_API_PASSWORD);
}
