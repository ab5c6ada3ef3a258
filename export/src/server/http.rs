//! HTTP server implementation for the export service.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tokio::signal;

use super::config::ExportServerConfig;
use super::handlers::{
    AppState, handle_cancel, handle_check, handle_healthy, handle_list, handle_metrics,
    handle_ready, handle_restore, handle_start,
};
use super::metrics::{Metrics, track_requests};
use crate::error::{Error, Result};
use crate::metrics::ExportMetrics;
use crate::service::ExportService;

/// Builds the API router over `state`.
pub fn router(state: AppState) -> Router {
    let metrics = Arc::clone(&state.metrics);
    Router::new()
        .route("/api/v1/export", post(handle_start))
        .route("/api/v1/export/{id}", get(handle_check))
        .route("/api/v1/export/{id}/cancel", post(handle_cancel))
        .route("/api/v1/export/{id}/restore", post(handle_restore))
        .route("/api/v1/exports", get(handle_list))
        .route("/metrics", get(handle_metrics))
        .route("/-/healthy", get(handle_healthy))
        .route("/-/ready", get(handle_ready))
        .route_layer(middleware::from_fn_with_state(metrics, track_requests))
        .with_state(state)
}

/// HTTP server for the export service.
pub struct ExportServer {
    service: Arc<ExportService>,
    export_metrics: ExportMetrics,
    config: ExportServerConfig,
}

impl ExportServer {
    pub fn new(
        service: Arc<ExportService>,
        export_metrics: ExportMetrics,
        config: ExportServerConfig,
    ) -> Self {
        Self {
            service,
            export_metrics,
            config,
        }
    }

    /// Serves until SIGINT or SIGTERM, then stops the export service.
    pub async fn run(self) -> Result<()> {
        let mut metrics = Metrics::new();
        self.export_metrics.register(metrics.registry_mut());

        let state = AppState {
            service: Arc::clone(&self.service),
            metrics: Arc::new(metrics),
        };
        let app = router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        tracing::info!("Starting export HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("binding {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(format!("serving HTTP: {}", e)))?;

        self.service.shutdown().await;
        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Listen for SIGTERM (K8s pod termination) and SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
