//! HTTP route handlers for the export server.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};

use super::error::ApiError;
use super::metrics::Metrics;
use super::request::StartExportBody;
use super::response::{ExportResponse, ExportsResponse, StartExportResponse, StatusResponse};
use crate::service::ExportService;

/// Header carrying the authenticated caller.
pub const USER_HEADER: &str = "x-user-id";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ExportService>,
    pub metrics: Arc<Metrics>,
}

fn caller(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Handle POST /api/v1/export
pub async fn handle_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<StartExportBody>,
) -> Result<(StatusCode, Json<StartExportResponse>), ApiError> {
    let id = state
        .service
        .start_export(caller(&headers), body.into())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(StartExportResponse::success(id))))
}

/// Handle GET /api/v1/export/{id}
///
/// Session ids contain a `/`, which clients send percent-encoded as `%2F`.
pub async fn handle_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ExportResponse>, ApiError> {
    let info = state.service.check_export(caller(&headers), &id).await?;
    Ok(Json(ExportResponse::success(info)))
}

/// Handle POST /api/v1/export/{id}/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.service.cancel_export(caller(&headers), &id).await?;
    Ok(Json(StatusResponse::success()))
}

/// Handle POST /api/v1/export/{id}/restore
pub async fn handle_restore(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    state.service.restore_export(caller(&headers), &id).await?;
    Ok((StatusCode::ACCEPTED, Json(StatusResponse::success())))
}

/// Handle GET /api/v1/exports
pub async fn handle_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ExportsResponse>, ApiError> {
    let exports = state.service.get_all(caller(&headers)).await?;
    Ok(Json(ExportsResponse::success(exports)))
}

/// Handle GET /metrics
pub async fn handle_metrics(State(state): State<AppState>) -> String {
    state.metrics.encode()
}

/// Handle GET /-/healthy
pub async fn handle_healthy() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Handle GET /-/ready
pub async fn handle_ready() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
