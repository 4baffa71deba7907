//! Menuguard test utilities.
//!
//! Fixtures for page records and menu artifacts, throwaway project
//! directories, and a mock content platform / menu API for integration
//! tests.

use std::path::{Path, PathBuf};

use serde_json::{Value as JsonValue, json};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Page URL prefix used by fixtures.
pub const PAGE_BASE: &str = "https://experience.arcgis.com/experience/test-app/page/";

/// Application id used by fixtures.
pub const APP_ID: &str = "test-app";

/// Token issued by [`MockPlatform::mount_token`].
pub const TOKEN: &str = "test-token";

/// Password expected by [`MockPlatform::mount_menu_api`].
pub const MENU_API_PASSWORD: &str = "test-password";

/// Full page URL for a page key.
pub fn page_url(key: &str) -> String {
    format!("{PAGE_BASE}{key}")
}

/// Create a visible, navigable page record.
pub fn test_page(label: &str) -> TestPage {
    TestPage {
        label: Some(label.to_string()),
        visible: None,
        show_in_nav: None,
    }
}

/// A page record builder.
#[derive(Debug, Clone)]
pub struct TestPage {
    pub label: Option<String>,
    pub visible: Option<bool>,
    pub show_in_nav: Option<bool>,
}

impl TestPage {
    /// Set `visible: false`.
    pub fn hidden(mut self) -> Self {
        self.visible = Some(false);
        self
    }

    /// Set `showInNav: false`.
    pub fn out_of_nav(mut self) -> Self {
        self.show_in_nav = Some(false);
        self
    }

    /// Drop the label.
    pub fn unlabeled(mut self) -> Self {
        self.label = None;
        self
    }

    /// The record as the platform returns it. Unset flags are omitted.
    pub fn to_json(&self) -> JsonValue {
        let mut record = serde_json::Map::new();
        if let Some(label) = &self.label {
            record.insert("label".into(), json!(label));
        }
        if let Some(visible) = self.visible {
            record.insert("visible".into(), json!(visible));
        }
        if let Some(show) = self.show_in_nav {
            record.insert("showInNav".into(), json!(show));
        }
        record.insert("layout".into(), json!({}));
        JsonValue::Object(record)
    }
}

/// An application data document with the given pages.
pub fn pages_document(pages: &[(&str, TestPage)]) -> JsonValue {
    let pages: serde_json::Map<String, JsonValue> = pages
        .iter()
        .map(|(key, page)| ((*key).to_string(), page.to_json()))
        .collect();
    json!({ "pages": pages, "widgets": {} })
}

/// Create a menu category fixture.
pub fn test_category(name: &str, color: &str) -> TestCategory {
    TestCategory {
        name: name.to_string(),
        color: color.to_string(),
        links: Vec::new(),
    }
}

/// A menu category builder.
#[derive(Debug, Clone)]
pub struct TestCategory {
    pub name: String,
    pub color: String,
    pub links: Vec<JsonValue>,
}

impl TestCategory {
    /// Add a link to a platform page.
    pub fn with_page_link(self, label: &str, key: &str) -> Self {
        self.with_link(label, &page_url(key))
    }

    /// Add a link to an arbitrary URL.
    pub fn with_link(mut self, label: &str, href: &str) -> Self {
        self.links.push(json!({ "label": label, "href": href, "term": label }));
        self
    }

    pub fn to_json(&self) -> JsonValue {
        json!({ "category": self.name, "color": self.color, "links": self.links })
    }
}

/// A menu artifact made of the given categories.
pub fn menu_json(categories: &[TestCategory]) -> JsonValue {
    JsonValue::Array(categories.iter().map(TestCategory::to_json).collect())
}

/// Link labels of every category in an artifact, in order.
pub fn menu_labels(menu: &JsonValue) -> Vec<(String, Vec<String>)> {
    let Some(categories) = menu.as_array() else {
        return Vec::new();
    };
    categories
        .iter()
        .map(|c| {
            let name = c["category"].as_str().unwrap_or_default().to_string();
            let labels = c["links"]
                .as_array()
                .map(|links| {
                    links
                        .iter()
                        .map(|l| l["label"].as_str().unwrap_or_default().to_string())
                        .collect()
                })
                .unwrap_or_default();
            (name, labels)
        })
        .collect()
}

/// A temporary project directory, removed on drop.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("failed to create temp dir: {e}"));
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `menu.json` in the project.
    pub fn menu_path(&self) -> PathBuf {
        self.root().join("menu.json")
    }

    /// Write the artifact pretty-printed, as menuguard writes it.
    pub fn write_menu(&self, menu: &JsonValue) {
        let text = serde_json::to_string_pretty(menu)
            .unwrap_or_else(|e| panic!("failed to serialize menu: {e}"));
        self.write_menu_raw(&text);
    }

    pub fn write_menu_raw(&self, text: &str) {
        std::fs::write(self.menu_path(), text)
            .unwrap_or_else(|e| panic!("failed to write menu: {e}"));
    }

    pub fn read_menu_raw(&self) -> String {
        std::fs::read_to_string(self.menu_path())
            .unwrap_or_else(|e| panic!("failed to read menu: {e}"))
    }

    pub fn read_menu(&self) -> JsonValue {
        serde_json::from_str(&self.read_menu_raw())
            .unwrap_or_else(|e| panic!("menu is not JSON: {e}"))
    }

    /// Write a credential store file and return its path.
    pub fn write_store(&self, pairs: &[(&str, &str)]) -> PathBuf {
        let store = self.root().join(".env");
        let content: String = pairs.iter().map(|(k, v)| format!("{k}={v}\n")).collect();
        std::fs::write(&store, content).unwrap_or_else(|e| panic!("failed to write store: {e}"));
        store
    }

    /// Backup files next to the artifact.
    pub fn backups(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = std::fs::read_dir(self.root())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| {
                        p.file_name()
                            .is_some_and(|n| n.to_string_lossy().starts_with("menu_backup_"))
                    })
                    .collect()
            })
            .unwrap_or_default();
        found.sort();
        found
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Content platform and menu API on one mock server.
pub struct MockPlatform {
    pub server: MockServer,
}

impl MockPlatform {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn token_url(&self) -> String {
        format!("{}/sharing/rest/oauth2/token", self.uri())
    }

    pub fn content_url(&self) -> String {
        format!("{}/sharing/rest/content/items", self.uri())
    }

    /// Store entries pointing every endpoint at this server.
    pub fn store_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("ARCGIS_CLIENT_ID".into(), "client".into()),
            ("ARCGIS_CLIENT_SECRET".into(), "secret".into()),
            ("ARCGIS_BASE_EXPERIENCE_ID".into(), APP_ID.into()),
            ("ARCGIS_TOKEN_URL".into(), self.token_url()),
            ("ARCGIS_CONTENT_URL".into(), self.content_url()),
            ("MENU_API_BASE_URL".into(), self.uri()),
            ("MENU_API_PASSWORD".into(), MENU_API_PASSWORD.into()),
            ("HTTP_TIMEOUT_SECS".into(), "5".into()),
        ]
    }

    /// Issue [`TOKEN`] for client-credentials requests.
    pub async fn mount_token(&self) {
        Mock::given(method("POST"))
            .and(path("/sharing/rest/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": TOKEN, "expires_in": 7200 })),
            )
            .mount(&self.server)
            .await;
    }

    /// Reject every token request the way the platform does (200 + error body).
    pub async fn mount_token_rejected(&self) {
        Mock::given(method("POST"))
            .and(path("/sharing/rest/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {
                    "code": 400,
                    "error": "invalid_client",
                    "error_description": "Invalid client_id"
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve `document` as the application's data.
    pub async fn mount_pages(&self, app_id: &str, document: JsonValue) {
        Mock::given(method("GET"))
            .and(path(format!("/sharing/rest/content/items/{app_id}/data")))
            .and(query_param("token", TOKEN))
            .and(query_param("f", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Fail the application's data request with `status`.
    pub async fn mount_pages_status(&self, app_id: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/sharing/rest/content/items/{app_id}/data")))
            .respond_with(ResponseTemplate::new(status).set_body_string("unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Answer `POST /menu?pw=<MENU_API_PASSWORD>` with `status` and `body`.
    pub async fn mount_menu_api(&self, status: u16, body: JsonValue) {
        Mock::given(method("POST"))
            .and(path("/menu"))
            .and(query_param("pw", MENU_API_PASSWORD))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Requests received for `path`.
    pub async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }
}

/// Assertion helpers.
pub mod assert {
    use serde_json::Value;

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that no category in an artifact has an empty `links` list.
    pub fn no_empty_categories(menu: &Value) {
        let empty: Vec<&Value> = menu
            .as_array()
            .map(|c| {
                c.iter()
                    .filter(|c| c["links"].as_array().is_some_and(Vec::is_empty))
                    .collect()
            })
            .unwrap_or_default();
        assert!(empty.is_empty(), "Expected no empty categories, found: {empty:?}");
    }
}
