//! HTTP publish target: `POST {base_url}/menu?pw=<password>`.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::config::PublishEndpoint;
use crate::error::PublishError;

const STEP: &str = "POST /menu";

/// Longest response body kept in an error.
const BODY_EXCERPT_LEN: usize = 1024;

/// Posts the menu artifact to the menu API.
#[derive(Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    url: String,
    password: String,
}

impl HttpPublisher {
    pub fn new(endpoint: &PublishEndpoint) -> Self {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: format!("{}/menu", endpoint.base_url.trim_end_matches('/')),
            password: endpoint.password.clone(),
        }
    }

    /// Read the artifact at `path` and post it as the request body.
    ///
    /// Returns the `message` field of a JSON success response, if any.
    /// An unreadable or malformed artifact, a transport failure, and a
    /// non-2xx status are all reported as a failure of this target.
    pub async fn publish(&self, path: &Path) -> Result<Option<String>, PublishError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PublishError::http("read artifact", format!("{}: {e}", path.display())))?;
        let body: Value = serde_json::from_str(&content).map_err(|e| {
            PublishError::http("read artifact", format!("invalid JSON in {}: {e}", path.display()))
        })?;

        let response = self
            .client
            .post(&self.url)
            .query(&[("pw", self.password.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::http(STEP, format!("network error: {}", e.without_url())))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PublishError::http(
                STEP,
                format!("server returned {status}: {}", excerpt(&text)),
            ));
        }

        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|json| json.get("message").and_then(Value::as_str).map(str::to_string));

        info!(url = %self.url, status = %status, "menu published");
        Ok(message)
    }
}

fn excerpt(body: &str) -> &str {
    if body.len() <= BODY_EXCERPT_LEN {
        return body;
    }
    let mut end = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
