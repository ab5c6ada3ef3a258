//! HTTP request bodies.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::service::ExportRequest;

/// Body of `POST /api/v1/export`.
///
/// Timestamps are RFC 3339; their offset decides which midnight partition
/// boundaries are measured from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExportBody {
    pub name: String,
    pub query: String,
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    /// Search window length in seconds.
    pub window_secs: u64,
}

impl From<StartExportBody> for ExportRequest {
    fn from(body: StartExportBody) -> Self {
        ExportRequest {
            query: body.query,
            from: body.from,
            to: body.to,
            window: Duration::from_secs(body.window_secs),
            name: body.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_start_body_keeping_offset() {
        // given
        let json = r#"{
            "name": "errors",
            "query": "level:error",
            "from": "2024-01-01T00:00:00+02:00",
            "to": "2024-01-01T03:00:00+02:00",
            "windowSecs": 600
        }"#;

        // when
        let body: StartExportBody = serde_json::from_str(json).unwrap();
        let request = ExportRequest::from(body);

        // then
        assert_eq!(request.window, Duration::from_secs(600));
        assert_eq!(request.from.offset().local_minus_utc(), 7200);
        assert_eq!(request.name, "errors");
    }
}
