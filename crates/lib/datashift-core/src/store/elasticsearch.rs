use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tracing::debug;

use super::{SearchBackend, StoreError, StoreResult};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const NDJSON: &str = "application/x-ndjson";

/// Connection settings for an Elasticsearch cluster.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout: Duration,
}

impl ElasticsearchConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Elasticsearch REST client.
#[derive(Clone)]
pub struct ElasticsearchClient {
    http: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticsearchClient {
    /// Builds a client for the configured cluster.
    ///
    /// # Errors
    /// Returns `StoreError` if the URL is blank or the HTTP client cannot be built.
    pub fn new(config: &ElasticsearchConfig) -> StoreResult<Self> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StoreError::InvalidInput(
                "elasticsearch url is required".to_string(),
            ));
        }
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%method, %url, "elasticsearch request");
        let builder = self.http.request(method, url);
        match self.username.as_ref() {
            Some(username) => builder.basic_auth(username, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send_json(builder: RequestBuilder) -> StoreResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn ping(&self) -> bool {
        match self.request(Method::HEAD, "/").send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "elasticsearch ping failed");
                false
            }
        }
    }

    async fn search(&self, index: &str, body: Value, scroll: Option<&str>) -> StoreResult<Value> {
        let path = match scroll {
            Some(keep_alive) => format!("{index}/_search?scroll={keep_alive}"),
            None => format!("{index}/_search"),
        };
        Self::send_json(self.request(Method::POST, &path).json(&body)).await
    }

    async fn scroll(&self, scroll_id: &str, keep_alive: &str) -> StoreResult<Value> {
        let body = json!({ "scroll": keep_alive, "scroll_id": scroll_id });
        Self::send_json(self.request(Method::POST, "_search/scroll").json(&body)).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        let body = json!({ "scroll_id": [scroll_id] });
        Self::send_json(self.request(Method::DELETE, "_search/scroll").json(&body)).await?;
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Value> {
        let path = format!("{index}/_doc/{}", urlencoding::encode(id));
        let response = self.request(Method::GET, &path).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::NOT_FOUND && !is_error_body(&body) {
            return Err(StoreError::NotFound(format!(
                "document {id} not found in index {index}"
            )));
        }
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
    }

    async fn get_aliases(&self, pattern: &str) -> StoreResult<Value> {
        Self::send_json(self.request(Method::GET, &format!("{pattern}/_alias"))).await
    }

    async fn get_mapping(&self, index: &str) -> StoreResult<Value> {
        Self::send_json(self.request(Method::GET, &format!("{index}/_mapping"))).await
    }

    async fn count(&self, index: &str, body: Value) -> StoreResult<Value> {
        Self::send_json(self.request(Method::POST, &format!("{index}/_count")).json(&body)).await
    }

    async fn bulk(&self, lines: Vec<Value>) -> StoreResult<Value> {
        let mut payload = String::new();
        for line in &lines {
            let encoded =
                serde_json::to_string(line).map_err(|err| StoreError::Decode(err.to_string()))?;
            payload.push_str(&encoded);
            payload.push('\n');
        }
        let builder = self
            .request(Method::POST, "_bulk")
            .header(CONTENT_TYPE, NDJSON)
            .body(payload);
        Self::send_json(builder).await
    }

    async fn refresh(&self, index: &str) -> StoreResult<()> {
        Self::send_json(self.request(Method::POST, &format!("{index}/_refresh"))).await?;
        Ok(())
    }

    async fn cluster_health(&self) -> StoreResult<Value> {
        Self::send_json(self.request(Method::GET, "_cluster/health")).await
    }

    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        let response = self.request(Method::HEAD, index).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(status_error(status, "")),
        }
    }
}

/// A 404 from the document API carries either `found: false` (missing
/// document) or an `error` object (missing index).
fn is_error_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .map(|value| value.get("error").is_some())
        .unwrap_or(false)
}

fn status_error(status: StatusCode, body: &str) -> StoreError {
    let reason = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| error_reason(&value))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });
    StoreError::Status {
        status: status.as_u16(),
        reason,
    }
}

fn error_reason(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    let reason = error.get("reason").and_then(Value::as_str);
    let kind = error.get("type").and_then(Value::as_str);
    match (kind, reason) {
        (Some(kind), Some(reason)) => Some(format!("{kind}: {reason}")),
        (None, Some(reason)) => Some(reason.to_string()),
        (Some(kind), None) => Some(kind.to_string()),
        (None, None) => None,
    }
}
