//! HTTP metrics for the export server.
//!
//! The server owns the [`Registry`]; engine metrics are added to it through
//! [`Metrics::registry_mut`] before it is shared with the handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// The API only routes GET and POST.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Verb {
    Get,
    Post,
    Other,
}

impl From<&Method> for Verb {
    fn from(method: &Method) -> Self {
        match *method {
            Method::GET => Verb::Get,
            Method::POST => Verb::Post,
            _ => Verb::Other,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RouteLabels {
    pub method: Verb,
    pub endpoint: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResponseLabels {
    pub method: Verb,
    pub endpoint: String,
    pub status: u16,
}

pub struct Metrics {
    registry: Registry,
    pub responses: Family<ResponseLabels, Counter>,
    pub latency_seconds: Family<RouteLabels, Histogram>,
    pub in_flight: Gauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let responses = Family::<ResponseLabels, Counter>::default();
        // 1ms .. ~8s
        let latency_seconds = Family::<RouteLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 14))
        });
        let in_flight = Gauge::default();

        registry.register(
            "http_requests",
            "HTTP requests answered, by route and status",
            responses.clone(),
        );
        registry.register(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
            latency_seconds.clone(),
        );
        registry.register(
            "http_requests_in_flight",
            "HTTP requests currently being handled",
            in_flight.clone(),
        );

        Self {
            registry,
            responses,
            latency_seconds,
            in_flight,
        }
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Prometheus text exposition of everything registered.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &self.registry) {
            tracing::error!("encoding metrics failed: {}", e);
        }
        buffer
    }
}

/// Route layer timing every matched request.
pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let route = RouteLabels {
        method: Verb::from(request.method()),
        endpoint: request
            .extensions()
            .get::<MatchedPath>()
            .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string()),
    };

    metrics.in_flight.inc();
    let started = Instant::now();
    let response = next.run(request).await;
    metrics.in_flight.dec();

    metrics
        .latency_seconds
        .get_or_create(&route)
        .observe(started.elapsed().as_secs_f64());
    metrics
        .responses
        .get_or_create(&ResponseLabels {
            method: route.method,
            endpoint: route.endpoint,
            status: response.status().as_u16(),
        })
        .inc();
    response
}
