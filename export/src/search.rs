//! Search Source: the remote, paginated log search the engine exports from.
//!
//! The engine only depends on the [`SearchSource`] trait. [`HttpSearchSource`]
//! is the production client; tests script their own implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// A single log event as returned by the search service.
pub type LogEvent = Value;

/// Errors surfaced by a search source.
///
/// `RateExceeded` is the only retryable condition; the rate-limited wrapper
/// absorbs it and retries with backoff.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("rate exceeded: {0}")]
    RateExceeded(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("cancelled")]
    Cancelled,
}

/// One page of a search over `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub session_id: String,
    pub query: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: usize,
    pub offset: usize,
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Fetches one page of events. Implementations return promptly once
    /// `cancel` fires.
    async fn search(
        &self,
        cancel: &CancellationToken,
        request: &SearchRequest,
    ) -> Result<Vec<LogEvent>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<LogEvent>,
}

/// Search source speaking JSON over HTTP.
///
/// Each page is a `POST` of the [`SearchRequest`] to the configured URL; the
/// response carries `{"events": [...]}`. HTTP 429 is reported as
/// [`SearchError::RateExceeded`].
#[derive(Debug, Clone)]
pub struct HttpSearchSource {
    endpoint: Url,
    client: HttpClient,
}

impl HttpSearchSource {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SearchError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| SearchError::Request(format!("invalid search url {}: {}", endpoint, e)))?;
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Request(e.to_string()))?;
        Ok(Self { endpoint, client })
    }

    async fn send(&self, request: &SearchRequest) -> Result<Vec<LogEvent>, SearchError> {
        let res = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            return Err(SearchError::RateExceeded(body));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SearchError::Request(format!("HTTP {}: {}", status, body)));
        }

        let response: SearchResponse = res
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(response.events)
    }
}

#[async_trait]
impl SearchSource for HttpSearchSource {
    #[tracing::instrument(level = "debug", skip_all, fields(session = %request.session_id, offset = request.offset))]
    async fn search(
        &self,
        cancel: &CancellationToken,
        request: &SearchRequest,
    ) -> Result<Vec<LogEvent>, SearchError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(SearchError::Cancelled),
            result = self.send(request) => result,
        }
    }
}
