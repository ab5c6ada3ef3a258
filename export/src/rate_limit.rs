//! Pacing and backoff around a [`SearchSource`].
//!
//! Every successful call is stretched to at least `delay` so a fast search
//! service is still not hammered. A "rate exceeded" answer never reaches the
//! caller: the call sleeps with exponential backoff and retries until it
//! succeeds, fails differently, or is cancelled. Backoff state is fresh for
//! every call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::metrics::ExportMetrics;
use crate::search::{LogEvent, SearchError, SearchRequest, SearchSource};

/// Pacing and backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum wall time of a successful call.
    pub delay: Duration,
    /// First backoff interval after a rate-exceeded answer.
    pub initial_backoff: Duration,
    /// Upper bound of a single backoff interval.
    pub max_backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

pub struct RateLimitedSearchSource {
    inner: Arc<dyn SearchSource>,
    config: RateLimitConfig,
    metrics: ExportMetrics,
}

impl RateLimitedSearchSource {
    pub fn new(inner: Arc<dyn SearchSource>, config: RateLimitConfig, metrics: ExportMetrics) -> Self {
        Self {
            inner,
            config,
            metrics,
        }
    }

    fn new_backoff(&self) -> backoff::ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_backoff)
            .with_multiplier(2.0)
            .with_max_interval(self.config.max_backoff)
            .with_max_elapsed_time(None)
            .build()
    }
}

#[async_trait]
impl SearchSource for RateLimitedSearchSource {
    async fn search(
        &self,
        cancel: &CancellationToken,
        request: &SearchRequest,
    ) -> Result<Vec<LogEvent>, SearchError> {
        let mut backoff = self.new_backoff();
        loop {
            let started = Instant::now();
            self.metrics.search_requests_total.inc();
            match self.inner.search(cancel, request).await {
                Ok(events) => {
                    if let Some(rest) = self.config.delay.checked_sub(started.elapsed()) {
                        sleep(cancel, rest).await?;
                    }
                    return Ok(events);
                }
                Err(SearchError::RateExceeded(msg)) => {
                    self.metrics.search_rate_limited_total.inc();
                    let wait = backoff.next_backoff().unwrap_or(self.config.max_backoff);
                    tracing::warn!(
                        session = %request.session_id,
                        offset = request.offset,
                        "search rate exceeded ({}), retrying in {:?}",
                        msg,
                        wait
                    );
                    sleep(cancel, wait).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Sleeps for `duration` unless `cancel` fires first.
async fn sleep(cancel: &CancellationToken, duration: Duration) -> Result<(), SearchError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(SearchError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
