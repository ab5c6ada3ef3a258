//! HTTP response bodies.

use serde::Serialize;

use crate::model::ExportInfo;

#[derive(Debug, Serialize)]
pub struct StartExportResponse {
    pub status: &'static str,
    pub id: String,
}

impl StartExportResponse {
    pub fn success(id: String) -> Self {
        Self {
            status: "success",
            id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub status: &'static str,
    pub export: ExportInfo,
}

impl ExportResponse {
    pub fn success(export: ExportInfo) -> Self {
        Self {
            status: "success",
            export,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportsResponse {
    pub status: &'static str,
    pub exports: Vec<ExportInfo>,
}

impl ExportsResponse {
    pub fn success(exports: Vec<ExportInfo>) -> Self {
        Self {
            status: "success",
            exports,
        }
    }
}

/// Body of operations that return nothing but their outcome.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self { status: "success" }
    }
}
