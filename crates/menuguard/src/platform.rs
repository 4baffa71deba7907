//! Content platform client.
//!
//! Exchanges client credentials for a bearer token and fetches the page
//! collection of a published application. Each call issues exactly one
//! request; retries are left to the caller.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Credentials, Settings};
use crate::error::{MenuError, MenuResult};
use crate::visibility::{PageRecord, PageSet};

/// Longest response excerpt kept in error messages.
const BODY_EXCERPT_LEN: usize = 512;

/// Short-lived bearer token. Expiry is not tracked; fetch a fresh one per run.
#[derive(Clone)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// HTTP client for the token and content endpoints.
#[derive(Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    token_url: String,
    content_url: String,
}

impl PlatformClient {
    /// Create a client with an explicit per-request timeout.
    pub fn new(
        token_url: impl Into<String>,
        content_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            token_url: token_url.into(),
            content_url: content_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from the configured endpoints and timeout.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.token_url.clone(),
            settings.content_url.clone(),
            settings.http_timeout,
        )
    }

    /// Exchange client credentials for a bearer token.
    ///
    /// Fails with [`MenuError::Auth`] when the endpoint rejects the exchange
    /// or the response carries no `access_token`.
    pub async fn acquire_token(&self, credentials: &Credentials) -> MenuResult<Token> {
        let form = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("f", "json"),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| MenuError::auth(format!("request to {} failed: {e}", self.token_url)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MenuError::auth(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            return Err(MenuError::auth(format!(
                "token endpoint returned {status}: {}",
                excerpt(&body)
            )));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| MenuError::auth(format!("token response is not JSON: {e}")))?;

        match json.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                debug!(client_id = %credentials.client_id, "access token acquired");
                Ok(Token::new(token))
            }
            _ => Err(MenuError::auth(match platform_error(&json) {
                Some(message) => format!("token endpoint rejected credentials: {message}"),
                None => "token response has no access_token".to_string(),
            })),
        }
    }

    /// Fetch the page collection of an application.
    ///
    /// A response without a `pages` object yields an empty set: some
    /// applications have no pages. A single undecodable page record is kept
    /// as a not-visible page. Transport failures, non-success statuses,
    /// undecodable bodies, and platform error objects are [`MenuError::Fetch`].
    pub async fn fetch_pages(&self, token: &Token, app_id: &str) -> MenuResult<PageSet> {
        let url = format!("{}/{app_id}/data", self.content_url);

        let response = self
            .http
            .get(&url)
            .query(&[("token", token.as_str()), ("f", "json")])
            .send()
            .await
            .map_err(|e| MenuError::fetch(app_id, format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MenuError::fetch(app_id, format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(MenuError::fetch(
                app_id,
                format!("content endpoint returned {status}: {}", excerpt(&body)),
            ));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| MenuError::fetch(app_id, format!("response is not JSON: {e}")))?;

        if let Some(message) = platform_error(&json) {
            return Err(MenuError::fetch(app_id, message));
        }

        let pages = parse_pages(&json).map_err(|details| MenuError::fetch(app_id, details))?;
        info!(app_id = %app_id, pages = pages.len(), "page collection fetched");
        Ok(pages)
    }
}

/// Extract the `pages` mapping from an application data document.
fn parse_pages(json: &Value) -> Result<PageSet, String> {
    let Some(pages) = json.get("pages") else {
        debug!("application data has no pages collection");
        return Ok(PageSet::new());
    };

    let Some(pages) = pages.as_object() else {
        return Err("'pages' is not an object".to_string());
    };

    let pages = pages
        .iter()
        .map(|(key, record)| {
            let page = serde_json::from_value::<PageRecord>(record.clone()).unwrap_or_else(|e| {
                warn!(
                    page = %key,
                    error = %e,
                    "undecodable page record, treating as not visible"
                );
                PageRecord {
                    visible: Some(false),
                    ..PageRecord::default()
                }
            });
            (key.clone(), page)
        })
        .collect();
    Ok(pages)
}

/// The message of a platform `{"error": {...}}` body, if present.
fn platform_error(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    let message = ["error_description", "message", "error"]
        .iter()
        .find_map(|field| error.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(match error.get("code").and_then(Value::as_i64) {
        Some(code) => format!("{message} (code {code})"),
        None => message,
    })
}

fn excerpt(body: &str) -> &str {
    if body.len() <= BODY_EXCERPT_LEN {
        return body;
    }
    let mut end = BODY_EXCERPT_LEN;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_pages_reads_records_with_defaults() {
        let doc = json!({
            "pages": {
                "page_84": {"label": "National", "visible": true, "showInNav": true, "layout": {}},
                "page_85": {"label": "Hidden", "visible": false},
                "page_86": {}
            }
        });

        let pages = parse_pages(&doc).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages["page_84"].label(), "National");
        assert!(!pages["page_85"].is_visible());
        assert!(pages["page_86"].is_visible());
        assert!(pages["page_86"].shows_in_nav());
        assert_eq!(pages["page_86"].label(), "");
    }

    #[test]
    fn missing_pages_is_empty_not_an_error() {
        assert!(parse_pages(&json!({"widgets": {}})).unwrap().is_empty());
    }

    #[test]
    fn bad_record_only_affects_itself() {
        let doc = json!({
            "pages": {
                "page_84": {"label": "National"},
                "page_7": {"label": "Legacy", "visible": 0},
                "page_8": "not a record"
            }
        });

        let pages = parse_pages(&doc).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages["page_84"].is_visible());
        assert!(!pages["page_7"].is_visible());
        assert!(!pages["page_8"].is_visible());
    }

    #[test]
    fn non_object_pages_is_an_error() {
        assert!(parse_pages(&json!({"pages": []})).is_err());
    }

    #[test]
    fn platform_error_prefers_description() {
        let doc = json!({"error": {
            "code": 400,
            "error": "invalid_client",
            "error_description": "Invalid client_id"
        }});
        assert_eq!(
            platform_error(&doc).as_deref(),
            Some("Invalid client_id (code 400)")
        );
        assert!(platform_error(&json!({"pages": {}})).is_none());
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "é".repeat(BODY_EXCERPT_LEN);
        let cut = excerpt(&body);
        assert!(cut.len() <= BODY_EXCERPT_LEN);
        assert!(body.starts_with(cut));
    }

    #[test]
    fn token_debug_is_redacted() {
        assert_eq!(format!("{:?}", Token::new("secret")), "Token(<redacted>)");
    }
}
