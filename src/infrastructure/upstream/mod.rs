use serde_json::Value;
use std::time::Duration;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a successful upstream response.
///
/// The synthesis server is loose about what it returns on 200: usually JSON,
/// sometimes plain text, sometimes nothing at all. All three are successes.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
    Empty,
}

/// Result of one upstream call. The error side is a human-readable
/// diagnostic suitable for storing on a failed task.
pub type UpstreamResult = Result<UpstreamBody, String>;

/// Thin HTTP caller for the external synthesis server.
///
/// Every failure mode (non-200 status, refused connection, timeout) is
/// converted into the error string of [`UpstreamResult`]; nothing propagates
/// past this boundary.
pub struct UpstreamClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `{base}{endpoint}` with an optional JSON payload.
    pub async fn call(&self, endpoint: &str, payload: Option<Value>) -> UpstreamResult {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!(url = %url, "Calling upstream synthesis server");

        let mut request = self.http_client.post(&url).timeout(UPSTREAM_TIMEOUT);
        if let Some(body) = payload {
            request = request.json(&body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::warn!(url = %url, "Upstream request timed out");
                return Err("request timed out: upstream server took too long".to_string());
            }
            Err(e) if e.is_connect() => {
                tracing::warn!(url = %url, "Upstream connection failed");
                return Err(
                    "connection error: check that the upstream server is running and the URL is correct"
                        .to_string(),
                );
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Upstream request failed");
                return Err(e.to_string());
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let message = format!("HTTP error: {} - {}", status.as_u16(), body);
            tracing::warn!(url = %url, status = status.as_u16(), "Upstream returned error status");
            return Err(message);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read upstream response: {}", e))?;

        if bytes.is_empty() {
            return Ok(UpstreamBody::Empty);
        }

        // Non-JSON 200 bodies are still successes; fall back to raw text.
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(json) => Ok(UpstreamBody::Json(json)),
            Err(_) => Ok(UpstreamBody::Text(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        }
    }
}
