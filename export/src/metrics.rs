//! Prometheus counters for the export engine.

use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Engine-level counters. Cheap to clone into tasks; all handles share the
/// same underlying atomics.
#[derive(Debug, Clone, Default)]
pub struct ExportMetrics {
    pub exports_started_total: Counter,
    pub exports_finished_total: Counter,
    pub exports_failed_total: Counter,
    pub exports_cancelled_total: Counter,
    /// 1 while a pipeline is running in this process.
    pub exports_running: Gauge,
    pub parts_exported_total: Counter,
    pub bytes_unpacked_total: Counter,
    pub bytes_packed_total: Counter,
    pub search_requests_total: Counter,
    pub search_rate_limited_total: Counter,
}

impl ExportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every counter with `registry`. Counter names gain a
    /// `_total` suffix when encoded.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "export_started",
            "Total number of exports started or restored",
            self.exports_started_total.clone(),
        );
        registry.register(
            "export_finished",
            "Total number of exports that finished",
            self.exports_finished_total.clone(),
        );
        registry.register(
            "export_failed",
            "Total number of exports that failed",
            self.exports_failed_total.clone(),
        );
        registry.register(
            "export_cancelled",
            "Total number of exports cancelled by a caller",
            self.exports_cancelled_total.clone(),
        );
        registry.register(
            "export_running",
            "Number of export pipelines running in this process",
            self.exports_running.clone(),
        );
        registry.register(
            "export_parts",
            "Total number of partitions uploaded and confirmed",
            self.parts_exported_total.clone(),
        );
        registry.register(
            "export_unpacked_bytes",
            "Total bytes of JSON lines exported before compression",
            self.bytes_unpacked_total.clone(),
        );
        registry.register(
            "export_packed_bytes",
            "Total bytes uploaded after compression",
            self.bytes_packed_total.clone(),
        );
        registry.register(
            "export_search_requests",
            "Total number of search pages requested",
            self.search_requests_total.clone(),
        );
        registry.register(
            "export_search_rate_limited",
            "Total number of search requests rejected as rate exceeded",
            self.search_rate_limited_total.clone(),
        );
    }
}
