#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Page classification against a mock content platform.

use menuguard::platform::PlatformClient;
use menuguard::visibility::{self, HideReason, VisibilityRules};
use menuguard::{MenuError, Settings};
use menuguard_test_utils::{MockPlatform, pages_document, test_page};

fn client_and_settings(platform: &MockPlatform) -> (PlatformClient, Settings) {
    let settings = Settings::from_pairs(platform.store_pairs()).unwrap();
    (PlatformClient::from_settings(&settings), settings)
}

#[tokio::test]
async fn test_classification_partitions_every_page() {
    let platform = MockPlatform::start().await;
    platform.mount_token().await;
    platform
        .mount_pages(
            "test-app",
            pages_document(&[
                ("page_84", test_page("National")),
                ("page_95", test_page("Heat Risk")),
                ("page_96", test_page("Old Incidents")),
                ("page_97", test_page("Coming Soon: Drought")),
                ("page_98", test_page("Internal Metrics")),
                ("page_154", test_page("Regional Summary")),
                ("page_200", test_page("Untitled").unlabeled()),
            ]),
        )
        .await;

    let (client, settings) = client_and_settings(&platform);
    let credentials = settings.credentials().unwrap();
    let result = visibility::classify(&client, &credentials, &VisibilityRules::default())
        .await
        .unwrap();

    assert_eq!(result.total(), 7);
    assert!(result.visible.keys().all(|k| !result.hidden.contains_key(k)));
    assert_eq!(
        result.visible.keys().map(String::as_str).collect::<Vec<_>>(),
        ["page_200", "page_84", "page_95"]
    );
    assert_eq!(result.reasons["page_96"], HideReason::TestPage);
    assert_eq!(result.reasons["page_97"], HideReason::UnderConstruction);
    assert_eq!(result.reasons["page_98"], HideReason::AdminPage);
    assert_eq!(result.reasons["page_154"], HideReason::ManualOverride);
}

#[tokio::test]
async fn test_not_visible_takes_precedence_over_keywords() {
    let platform = MockPlatform::start().await;
    platform.mount_token().await;
    platform
        .mount_pages(
            "test-app",
            pages_document(&[("page_1", test_page("Test Dashboard").hidden().out_of_nav())]),
        )
        .await;

    let (client, settings) = client_and_settings(&platform);
    let credentials = settings.credentials().unwrap();
    let result = visibility::classify(&client, &credentials, &VisibilityRules::default())
        .await
        .unwrap();

    assert_eq!(result.reasons["page_1"], HideReason::NotVisible);
    assert_eq!(result.reasons["page_1"].to_string(), "not visible");
}

#[tokio::test]
async fn test_missing_pages_collection_is_zero_pages() {
    let platform = MockPlatform::start().await;
    platform.mount_token().await;
    platform
        .mount_pages("test-app", serde_json::json!({ "widgets": {} }))
        .await;

    let (client, settings) = client_and_settings(&platform);
    let credentials = settings.credentials().unwrap();
    let result = visibility::classify(&client, &credentials, &VisibilityRules::default())
        .await
        .unwrap();
    assert_eq!(result.total(), 0);
}

#[tokio::test]
async fn test_rejected_credentials_are_an_auth_error() {
    let platform = MockPlatform::start().await;
    platform.mount_token_rejected().await;

    let (client, settings) = client_and_settings(&platform);
    let credentials = settings.credentials().unwrap();
    let err = visibility::classify(&client, &credentials, &VisibilityRules::default())
        .await
        .unwrap_err();

    assert!(matches!(err, MenuError::Auth { .. }));
    assert!(err.to_string().contains("Invalid client_id"));
}

#[tokio::test]
async fn test_failed_page_request_is_a_fetch_error() {
    let platform = MockPlatform::start().await;
    platform.mount_token().await;
    platform.mount_pages_status("test-app", 503).await;

    let (client, settings) = client_and_settings(&platform);
    let credentials = settings.credentials().unwrap();
    let err = visibility::classify(&client, &credentials, &VisibilityRules::default())
        .await
        .unwrap_err();

    match err {
        MenuError::Fetch { app_id, details } => {
            assert_eq!(app_id, "test-app");
            assert!(details.contains("503"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_custom_rules_replace_defaults() {
    let platform = MockPlatform::start().await;
    platform.mount_token().await;
    platform
        .mount_pages(
            "test-app",
            pages_document(&[
                ("page_154", test_page("Regional Summary")),
                ("page_2", test_page("Legacy Map")),
            ]),
        )
        .await;

    let rules = VisibilityRules::from_toml_str(
        "test_keywords = [\"Legacy\"]\nmanual_overrides = []\n",
        std::path::Path::new("rules.toml"),
    )
    .unwrap();

    let (client, settings) = client_and_settings(&platform);
    let result = visibility::classify(&client, &settings.credentials().unwrap(), &rules)
        .await
        .unwrap();

    assert!(result.is_visible("page_154"));
    assert_eq!(result.reasons["page_2"], HideReason::TestPage);
}
