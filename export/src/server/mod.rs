//! HTTP server for the export service.
//!
//! Exposes the export operations as a small JSON API, plus Prometheus
//! metrics and health probes. Caller identity is taken from the
//! `x-user-id` header.

pub mod config;
pub mod error;
pub mod handlers;
mod http;
pub mod metrics;
pub mod request;
pub mod response;

pub use config::{CliArgs, ExportServerConfig};
pub use http::{ExportServer, router};
